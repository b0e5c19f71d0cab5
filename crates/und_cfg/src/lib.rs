#![doc = include_str!("../README.md")]
#![no_std]

// -----------------------------------------------------------------------------
// Alias targets

/// Passes the provided code through unchanged.
///
/// - `enabled!()` evaluates to `true`.
/// - `enabled! { if { a } else { b } }` expands to `a`.
/// - `enabled! { ... }` expands to `...`.
#[doc(hidden)]
#[macro_export]
macro_rules! enabled {
    () => { true };
    (if { $($p:tt)* } else { $($n:tt)* }) => { $($p)* };
    ($($p:tt)*) => { $($p)* };
}

/// Suppresses the provided code.
///
/// - `disabled!()` evaluates to `false`.
/// - `disabled! { if { a } else { b } }` expands to `b`.
/// - `disabled! { ... }` expands to nothing.
#[doc(hidden)]
#[macro_export]
macro_rules! disabled {
    () => { false };
    (if { $($p:tt)* } else { $($n:tt)* }) => { $($n)* };
    ($($p:tt)*) => {};
}

// -----------------------------------------------------------------------------
// switch

/// Selects the first branch whose condition holds.
///
/// A condition is either a `#[cfg(...)]` predicate or the path of an alias
/// created by [`define_alias!`]. `_` always matches.
///
/// ```
/// und_cfg::switch! {
///     #[cfg(debug_assertions)] => {
///         fn mode() -> &'static str { "debug" }
///     }
///     _ => {
///         fn mode() -> &'static str { "release" }
///     }
/// }
/// assert!(!mode().is_empty());
/// ```
#[macro_export]
macro_rules! switch {
    ({ $($tt:tt)* }) => {{
        $crate::switch! { $($tt)* }
    }};
    (_ => { $($output:tt)* }) => {
        $($output)*
    };
    (
        $cond:path => $output:tt
        $($( $rest:tt )+)?
    ) => {
        $cond! {
            if {
                $crate::switch! { _ => $output }
            } else {
                $(
                    $crate::switch! { $($rest)+ }
                )?
            }
        }
    };
    (
        #[cfg($cfg:meta)] => $output:tt
        $($( $rest:tt )+)?
    ) => {
        #[cfg($cfg)]
        $crate::switch! { _ => $output }
        $(
            #[cfg(not($cfg))]
            $crate::switch! { $($rest)+ }
        )?
    };
}

// -----------------------------------------------------------------------------
// define_alias

/// Defines one macro per `#[cfg(...)] => name` pair.
///
/// Each generated macro behaves like `enabled!` when the predicate holds and
/// like `disabled!` otherwise.
///
/// ```
/// mod cfg {
///     und_cfg::define_alias! {
///         #[cfg(test)] => testing,
///         #[cfg(not(test))] => shipping,
///     }
/// }
///
/// assert!(cfg::shipping!() || cfg::testing!());
/// ```
#[macro_export]
macro_rules! define_alias {
    (
        #[cfg($meta:meta)] => $p:ident
        $(, $( $rest:tt )+)?
    ) => {
        $crate::define_alias! {
            #[cfg($meta)] => { $p }
            $(
                $($rest)+
            )?
        }
    };
    (
        #[cfg($meta:meta)] => $p:ident,
        $($( $rest:tt )+)?
    ) => {
        $crate::define_alias! {
            #[cfg($meta)] => { $p }
            $(
                $($rest)+
            )?
        }
    };
    (
        #[cfg($meta:meta)] => {
            $(#[$p_meta:meta])*
            $p:ident
        }
        $($( $rest:tt )+)?
    ) => {
        $crate::switch! {
            #[cfg($meta)] => {
                $(#[$p_meta])*
                #[doc(inline)]
                #[doc = concat!("Keeps its input because `#[cfg(", stringify!($meta), ")]` is active.")]
                pub use $crate::enabled as $p;
            }
            _ => {
                $(#[$p_meta])*
                #[doc(inline)]
                #[doc = concat!("Drops its input because `#[cfg(", stringify!($meta), ")]` is not active.")]
                pub use $crate::disabled as $p;
            }
        }

        $(
            $crate::define_alias! {
                $($rest)+
            }
        )?
    };
}
