//! Parameter values and keys.
//!
//! Parameters are addressed by integer key and carried as a tagged value, so
//! a front end can set any model or instance parameter without knowing the
//! family's Rust types.

use crate::error::{Error, Result};

/// Value of a model or instance parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Real(f64),
    Int(i64),
    Flag(bool),
    Vector(Vec<f64>),
}

impl ParamValue {
    /// Interpret as a real number. Integers convert.
    pub fn as_real(&self, key: u32) -> Result<f64> {
        match *self {
            ParamValue::Real(v) => Ok(v),
            ParamValue::Int(v) => Ok(v as f64),
            _ => Err(type_error(key, "real", self)),
        }
    }

    pub fn as_int(&self, key: u32) -> Result<i64> {
        match *self {
            ParamValue::Int(v) => Ok(v),
            _ => Err(type_error(key, "integer", self)),
        }
    }

    /// Interpret as a flag. Integers convert (nonzero is true).
    pub fn as_flag(&self, key: u32) -> Result<bool> {
        match *self {
            ParamValue::Flag(v) => Ok(v),
            ParamValue::Int(v) => Ok(v != 0),
            _ => Err(type_error(key, "flag", self)),
        }
    }

    pub fn as_vector(&self, key: u32) -> Result<&[f64]> {
        match self {
            ParamValue::Vector(v) => Ok(v),
            _ => Err(type_error(key, "vector", self)),
        }
    }
}

fn type_error(key: u32, expected: &str, got: &ParamValue) -> Error {
    Error::BadParameter {
        key,
        reason: format!("expected {expected}, got {got:?}"),
    }
}

/// A parameter value together with whether the user supplied it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Given<T> {
    value: T,
    given: bool,
}

impl<T: Copy> Given<T> {
    /// A defaulted value.
    pub const fn new(default: T) -> Self {
        Self {
            value: default,
            given: false,
        }
    }

    /// Store a user-supplied value.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.given = true;
    }

    pub fn get(&self) -> T {
        self.value
    }

    pub fn is_given(&self) -> bool {
        self.given
    }

    /// The value, if the user supplied it.
    pub fn given(&self) -> Option<T> {
        self.given.then_some(self.value)
    }

    /// Replace the value unless the user supplied it.
    pub fn default_to(&mut self, value: T) {
        if !self.given {
            self.value = value;
        }
    }

    /// Overwrite the value while keeping the given flag, for clamping.
    pub fn clamp_to(&mut self, value: T) {
        self.value = value;
    }
}

/// Declare a parameter key enum with a fallible conversion from `u32`.
macro_rules! param_keys {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl TryFrom<u32> for $name {
            type Error = $crate::error::Error;

            fn try_from(key: u32) -> $crate::error::Result<Self> {
                match key {
                    $(k if k == $value => Ok($name::$variant),)+
                    _ => Err($crate::error::Error::BadParameter {
                        key,
                        reason: format!("no such {} key", stringify!($name)),
                    }),
                }
            }
        }
    };
}

pub(crate) use param_keys;
