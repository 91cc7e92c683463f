/// Declares a payload type: a unit struct implementing
/// [`PayloadKind`](crate::elements::PayloadKind) whose class is the struct
/// name and whose root tag is the given literal. The body holds the
/// remaining trait items, `init` at least.
macro_rules! payload_kind {
    ($(#[$meta:meta])* $kind:ident => $tag:literal { $($body:tt)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $kind;

        impl $crate::elements::PayloadKind for $kind {
            fn class(&self) -> &'static str {
                stringify!($kind)
            }

            fn name(&self) -> &'static str {
                $tag
            }

            $($body)*
        }
    };
}
