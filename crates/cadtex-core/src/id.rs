use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(index: u32) -> Self {
                Self(index)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub fn value(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

define_id!(
    /// Dense index of a curve in its library.
    CurveId
);
define_id!(
    /// Dense index of a surface in its library.
    SurfaceId
);
define_id!(
    /// Dense index of a trim set in its library.
    TrimSetId
);
define_id!(
    /// Dense index of a body descriptor.
    BodyId
);

impl TrimSetId {
    /// Decode the signed on-disk form, where `-1` means "no trimming".
    pub fn from_signed(value: i32) -> Option<Self> {
        u32::try_from(value).ok().map(Self)
    }

    /// Signed form used in GPU instance records.
    pub fn to_signed(id: Option<Self>) -> i32 {
        id.map_or(-1, |id| id.0 as i32)
    }
}
