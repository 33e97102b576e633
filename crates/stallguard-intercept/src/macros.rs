//! Declaration macros for guarded operations and scope frames.

/// Declares a guarded operation.
///
/// The function first fires its own `static` [`CallSite`](crate::CallSite),
/// then runs the original body unchanged. Arguments, return value, errors
/// and panics pass through untouched.
///
/// `name` defaults to the function name and `signature` to the parenthesized
/// parameter types (receiver excluded). Methods taking `&self` or
/// `&mut self` are non-static; everything else is static. Generic parameter
/// lists are not supported; use `impl Trait` arguments instead.
///
/// # Example
///
/// ```rust
/// use stallguard_intercept::guarded_fn;
///
/// pub struct Db;
///
/// impl Db {
///     guarded_fn! {
///         owner = "app::Db";
///         pub fn query(&self, sql: &str) -> usize { sql.len() }
///     }
/// }
///
/// guarded_fn! {
///     owner = "app::io", name = "flush_all", signature = "*";
///     pub fn flush() {}
/// }
///
/// assert_eq!(Db.query("select 1"), 8);
/// flush();
/// ```
#[macro_export]
macro_rules! guarded_fn {
    (
        owner = $owner:literal $(, name = $name:literal)? $(, signature = $sig:literal)? ;
        $(#[$meta:meta])*
        $vis:vis fn $fn_name:ident (&mut $self:ident $(, $arg:ident : $ty:ty)* $(,)?)
            $(-> $ret:ty)? $body:block
    ) => {
        $(#[$meta])*
        $vis fn $fn_name(&mut $self $(, $arg: $ty)*) $(-> $ret)? {
            static __STALLGUARD_SITE: $crate::CallSite = $crate::CallSite::new(
                $owner,
                $crate::__guarded_name!($fn_name $(, $name)?),
                $crate::__guarded_signature!([$($sig)?] $($ty),*),
                false,
            );
            __STALLGUARD_SITE.intercept();
            $body
        }
    };
    (
        owner = $owner:literal $(, name = $name:literal)? $(, signature = $sig:literal)? ;
        $(#[$meta:meta])*
        $vis:vis fn $fn_name:ident (&$self:ident $(, $arg:ident : $ty:ty)* $(,)?)
            $(-> $ret:ty)? $body:block
    ) => {
        $(#[$meta])*
        $vis fn $fn_name(&$self $(, $arg: $ty)*) $(-> $ret)? {
            static __STALLGUARD_SITE: $crate::CallSite = $crate::CallSite::new(
                $owner,
                $crate::__guarded_name!($fn_name $(, $name)?),
                $crate::__guarded_signature!([$($sig)?] $($ty),*),
                false,
            );
            __STALLGUARD_SITE.intercept();
            $body
        }
    };
    (
        owner = $owner:literal $(, name = $name:literal)? $(, signature = $sig:literal)? ;
        $(#[$meta:meta])*
        $vis:vis fn $fn_name:ident ($($arg:ident : $ty:ty),* $(,)?)
            $(-> $ret:ty)? $body:block
    ) => {
        $(#[$meta])*
        $vis fn $fn_name($($arg: $ty),*) $(-> $ret)? {
            static __STALLGUARD_SITE: $crate::CallSite = $crate::CallSite::new(
                $owner,
                $crate::__guarded_name!($fn_name $(, $name)?),
                $crate::__guarded_signature!([$($sig)?] $($ty),*),
                true,
            );
            __STALLGUARD_SITE.intercept();
            $body
        }
    };
}

/// Enters a scope frame for the rest of the enclosing block.
///
/// Evaluates to a [`ScopeGuard`](stallguard_monitor::ScopeGuard); the frame
/// ends when the guard is dropped. The signature defaults to `"*"`.
///
/// ```rust
/// fn rebuild_index() {
///     let _frame = stallguard_intercept::frame!("app::Index", "rebuild");
///     // blocking calls here follow the directive for app::Index::rebuild
/// }
/// rebuild_index();
/// ```
#[macro_export]
macro_rules! frame {
    ($owner:literal, $name:literal $(,)?) => {
        $crate::frame!($owner, $name, "*")
    };
    ($owner:literal, $name:literal, $sig:literal $(,)?) => {{
        static __STALLGUARD_SCOPE: $crate::ScopeSite = $crate::ScopeSite::new($owner, $name, $sig);
        __STALLGUARD_SCOPE.enter()
    }};
}

/// Enters the one-time initializer frame of `owner`.
///
/// Place it at the top of a `LazyLock`/`OnceLock` initializer.
///
/// ```rust
/// use std::sync::OnceLock;
///
/// static CONFIG: OnceLock<String> = OnceLock::new();
///
/// fn config() -> &'static str {
///     CONFIG.get_or_init(|| {
///         let _frame = stallguard_intercept::static_init_frame!("app::Config");
///         "loaded".to_string()
///     })
/// }
/// assert_eq!(config(), "loaded");
/// ```
#[macro_export]
macro_rules! static_init_frame {
    ($owner:literal $(,)?) => {{
        static __STALLGUARD_SCOPE: $crate::ScopeSite = $crate::ScopeSite::static_initializer($owner);
        __STALLGUARD_SCOPE.enter()
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __guarded_name {
    ($fn_name:ident) => {
        stringify!($fn_name)
    };
    ($fn_name:ident, $name:literal) => {
        $name
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __guarded_signature {
    ([$sig:literal] $($ty:ty),*) => {
        $sig
    };
    ([] $($ty:ty),*) => {
        concat!("(", stringify!($($ty),*), ")")
    };
}

#[cfg(test)]
mod tests {
    crate::guarded_fn! {
        owner = "macro::tests";
        fn add(a: u32, b: u32) -> u32 { a + b }
    }

    crate::guarded_fn! {
        owner = "macro::tests", name = "renamed", signature = "*";
        fn early_return(flag: bool) -> &'static str {
            if flag {
                return "early";
            }
            "late"
        }
    }

    struct Counter(u32);

    impl Counter {
        crate::guarded_fn! {
            owner = "macro::tests::Counter";
            fn bump(&mut self, by: u32) -> u32 {
                self.0 += by;
                self.0
            }
        }

        crate::guarded_fn! {
            owner = "macro::tests::Counter";
            fn get(&self) -> u32 { self.0 }
        }
    }

    #[test]
    fn test_guarded_fn_forwards_arguments() {
        assert_eq!(add(2, 3), 5);
        assert_eq!(early_return(true), "early");
        assert_eq!(early_return(false), "late");
    }

    #[test]
    fn test_guarded_methods() {
        let mut counter = Counter(1);
        assert_eq!(counter.bump(2), 3);
        assert_eq!(counter.get(), 3);
    }

    #[test]
    fn test_signature_text() {
        assert_eq!(crate::__guarded_signature!([] u32, u32), "(u32, u32)");
        assert_eq!(crate::__guarded_signature!([]), "()");
        assert_eq!(crate::__guarded_signature!(["*"] u32), "*");
        assert_eq!(crate::__guarded_name!(sleep), "sleep");
        assert_eq!(crate::__guarded_name!(sleep, "nap"), "nap");
    }
}
