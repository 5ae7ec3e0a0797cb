use std::mem;

/// One float attribute inside an interleaved vertex.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct VertexAttribute {
    /// Name of the shader input this attribute feeds.
    pub name: &'static str,
    pub components: i32,
    /// Byte offset from the start of the vertex.
    pub offset: usize,
}

/// Field types that can be sourced as float vertex attributes.
pub trait AttributeFormat {
    const COMPONENTS: i32;
}

/// A plain-old-data vertex whose fields map one-to-one onto shader inputs.
///
/// Implement this with the `vertex!` macro rather than by hand so the
/// offsets always match the struct's actual layout.
pub trait VertexLayout: bytemuck::Pod {
    const ATTRIBUTES: &'static [VertexAttribute];

    fn stride() -> usize {
        mem::size_of::<Self>()
    }
}

macro_rules! layout_simple {
    ($type:ty: $amount:expr) => {
        impl AttributeFormat for $type {
            const COMPONENTS: i32 = $amount;
        }
    };
}

layout_simple!(f32: 1);
layout_simple!([f32; 1]: 1);
layout_simple!([f32; 2]: 2);
layout_simple!([f32; 3]: 3);
layout_simple!([f32; 4]: 4);

/// Declares a `#[repr(C)]` vertex struct and its [`VertexLayout`]. Field
/// names double as the shader input names they bind to.
macro_rules! vertex {
    ($(#[$meta:meta])* vertex $name:ident {
        $($attrib:ident: $attrib_type:ty,)*
    }) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, ::bytemuck::Pod, ::bytemuck::Zeroable)]
        #[repr(C)]
        pub struct $name {
            $(pub $attrib: $attrib_type),*
        }

        impl $crate::gl_api::layout::VertexLayout for $name {
            const ATTRIBUTES: &'static [$crate::gl_api::layout::VertexAttribute] = &[
                $($crate::gl_api::layout::VertexAttribute {
                    name: stringify!($attrib),
                    components:
                        <$attrib_type as $crate::gl_api::layout::AttributeFormat>::COMPONENTS,
                    offset: ::std::mem::offset_of!($name, $attrib),
                }),*
            ];
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    vertex! {
        vertex Sample {
            a_scalar: f32,
            a_pair: [f32; 2],
            a_rgba: [f32; 4],
        }
    }

    #[test]
    fn offsets_follow_declaration_order() {
        let names: Vec<_> = Sample::ATTRIBUTES.iter().map(|a| (a.name, a.components, a.offset)).collect();
        assert_eq!(names, [("a_scalar", 1, 0), ("a_pair", 2, 4), ("a_rgba", 4, 12)]);
        assert_eq!(Sample::stride(), 28);
    }
}
