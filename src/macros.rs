//! Small codegen macros shared by the constant catalogues and packed-field
//! types throughout the crate. Lifted from the parsing-combinator lineage
//! this crate grew out of: a newtype wrapping a numeric code, with
//! `FromStr`/`Display`/associated consts generated per named value.

macro_rules! pascal_name {
  ($name:ident) => {
    const_format::map_ascii_case!(const_format::Case::Pascal, core::stringify!($name))
  };
}

macro_rules! display_variants {
  ($struct_name:ident, $field_name:ident: $($variant_name:ident,)*) => {
    impl core::fmt::Display for $struct_name {
      fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
          $(&Self::$variant_name => write!(f, "{}: {}", $crate::macros::pascal_name!($variant_name), self.$field_name),)*
          _ => write!(f, "Unknown: {}", self.$field_name),
        }
      }
    }
  };
}

macro_rules! decl_variants {
  ($($(#[$docs:meta])* $variant_name:ident => $variant_value:expr,)*) => {
    $($(#[$docs])* pub const $variant_name: Self = Self::new($variant_value);)*
  };
}

/// Generates a `#[repr(transparent)]` newtype over an integer code, with one
/// named associated const per catalogue entry plus `From`/`FromStr`/`Display`.
macro_rules! struct_variants {
  ($struct_name:ident, $field_name:ident, $field_type:ty:
    $($(#[$variant_docs:meta])* $variant_name:ident => $variant_value:expr,)*
  ) => {
    #[doc=stringify!($struct_name)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[repr(transparent)]
    pub struct $struct_name {
      $field_name: $field_type,
    }

    impl $struct_name {
      $crate::macros::decl_variants!{$($(#[$variant_docs])* $variant_name => $variant_value,)*}

      /// Builds a value from its raw wire code.
      pub const fn new($field_name: $field_type) -> Self {
        Self { $field_name }
      }

      /// Returns the raw wire code.
      pub const fn $field_name(&self) -> $field_type {
        self.$field_name
      }
    }

    impl From<$field_type> for $struct_name {
      fn from($field_name: $field_type) -> Self {
        Self::new($field_name)
      }
    }

    impl From<$struct_name> for $field_type {
      fn from(this: $struct_name) -> Self {
        this.$field_name
      }
    }

    impl core::str::FromStr for $struct_name {
      type Err = ();
      fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
          $(core::stringify!($crate::macros::pascal_name!($variant_name)) => Ok(Self::$variant_name),)*
          _ => Err(()),
        }
      }
    }

    $crate::macros::display_variants!{
      $struct_name, $field_name:
        $($variant_name,)*
    }
  };
}

/// Generates `get_x`/`set_x` accessor pairs over a packed integer flags type,
/// plus a `Debug` impl listing every named bit.
macro_rules! bit_flags {
  ($struct_name:ident, $raw_ty:ty: $($name:ident => $pos:expr,)*) => {
    paste::paste! {
      impl $struct_name {
        $(
          #[doc = "Returns whether the `" $name "` bit is set."]
          pub const fn [<get_ $name>](&self) -> bool {
            self.raw & (1 << $pos) != 0
          }

          #[doc = "Sets or clears the `" $name "` bit."]
          pub fn [<set_ $name>](&mut self, state: bool) -> bool {
            if state {
              self.raw |= 1 << $pos;
            } else {
              self.raw &= !(1 << $pos);
            }
            state
          }
        )*
      }

      impl core::fmt::Debug for $struct_name {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
          f.debug_struct(core::stringify!($struct_name))
            $(.field(core::stringify!($name), &self.[<get_ $name>]()))*
            .finish()
        }
      }
    }
  };
}

pub(crate) use bit_flags;
pub(crate) use decl_variants;
pub(crate) use display_variants;
pub(crate) use pascal_name;
pub(crate) use struct_variants;
