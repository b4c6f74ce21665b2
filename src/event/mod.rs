//! Typed catalog of the generic kernel events.
//!
//! Every variant maps to one `perf_event_attr.config` selector, so counter
//! definitions never carry bare integers picked by hand.

pub mod hw;
pub mod sw;

macro_rules! selectors {
    ($ty:ident { $($variant:ident => ($code:ident, $name:literal),)+ }) => {
        impl $ty {
            /// All variants, in selector order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant,)+];

            /// Kernel event selector for `perf_event_attr.config`.
            pub fn code(&self) -> u64 {
                match self {
                    $($ty::$variant => $crate::ffi::bindings::$code,)+
                }
            }

            /// The name `perf list` reports for this event.
            pub fn name(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }

            pub fn from_code(code: u64) -> Option<Self> {
                match code {
                    $($crate::ffi::bindings::$code => Some($ty::$variant),)+
                    _ => None,
                }
            }
        }
    };
}
use selectors;
