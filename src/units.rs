//! Unit-safe physical quantities.

use std::fmt;
use std::ops::{Add, Sub};

/// Kilograms in one international avoirdupois pound.
pub const KILOGRAMS_PER_POUND: f64 = 0.453_592_37;

pub fn kilograms_to_pounds(kilograms: f64) -> f64 {
    kilograms / KILOGRAMS_PER_POUND
}

pub fn pounds_to_kilograms(pounds: f64) -> f64 {
    pounds * KILOGRAMS_PER_POUND
}

/// A mass, stored in kilograms. Either unit can be read back at any time
/// without the two views ever disagreeing.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Mass {
    kilograms: f64,
}

impl Mass {
    pub const fn from_kilograms(kilograms: f64) -> Self {
        Mass { kilograms }
    }

    pub fn from_pounds(pounds: f64) -> Self {
        Mass { kilograms: pounds_to_kilograms(pounds) }
    }

    pub fn kilograms(self) -> f64 {
        self.kilograms
    }

    pub fn pounds(self) -> f64 {
        kilograms_to_pounds(self.kilograms)
    }
}

impl Add for Mass {
    type Output = Mass;

    fn add(self, rhs: Mass) -> Mass {
        Mass::from_kilograms(self.kilograms + rhs.kilograms)
    }
}

impl Sub for Mass {
    type Output = Mass;

    fn sub(self, rhs: Mass) -> Mass {
        Mass::from_kilograms(self.kilograms - rhs.kilograms)
    }
}

impl fmt::Display for Mass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} kg", self.kilograms)
    }
}
