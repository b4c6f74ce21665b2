use super::Exclude;
use crate::counter::CounterDefinition;
use crate::ffi::{bindings as b, Attr};

pub(crate) fn from(def: &CounterDefinition, exclude: &Exclude) -> Attr {
    let mut attr = Attr {
        size: size_of::<Attr>() as _,
        ..Default::default()
    };

    // event config:

    attr.type_ = def.kind().as_raw();
    attr.config = def.code();

    // count config:

    macro_rules! when {
        ($bool:ident, $flag:ident) => {
            if exclude.$bool {
                attr.flags |= b::$flag;
            }
        };
    }
    when!(kernel, PERF_ATTR_FLAG_EXCLUDE_KERNEL);
    when!(hv, PERF_ATTR_FLAG_EXCLUDE_HV);

    // Threads spawned after attach fold their counts into this counter on read.
    attr.flags |= b::PERF_ATTR_FLAG_INHERIT;

    // Left enabled (`disabled` unset), counting starts as soon as the fd exists.
    attr
}
