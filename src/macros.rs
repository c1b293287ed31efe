/// Builds a [`Value`](crate::Value) from a JSON-like literal.
///
/// Lists are written `[...]` and structs `{"key": value, ...}`. Any other
/// expression is converted with `Value::from`, so integer literals become
/// `Int`, float literals `Float`, string literals `String`.
///
/// ```rust
/// use polyform::{value, Value};
///
/// let v = value!({
///     "id": 7,
///     "tags": ["a", "b"],
///     "offset": -3,
///     "nested": {"ok": true}
/// });
/// assert_eq!(v.struct_get("offset"), Some(&Value::Int(-3)));
/// assert_eq!(v.struct_get("tags").and_then(Value::list_size), Some(2));
/// ```
#[macro_export]
macro_rules! value {
    (@list [$($done:expr,)*]) => {
        $crate::Value::List(vec![$($done,)*])
    };
    (@list [$($done:expr,)*] - $num:literal $(, $($rest:tt)*)?) => {
        $crate::value!(@list [$($done,)* $crate::value!(-$num),] $($($rest)*)?)
    };
    (@list [$($done:expr,)*] $elem:tt $(, $($rest:tt)*)?) => {
        $crate::value!(@list [$($done,)* $crate::value!($elem),] $($($rest)*)?)
    };

    (@struct $map:ident) => {};
    (@struct $map:ident $key:literal : - $num:literal $(, $($rest:tt)*)?) => {
        $map.set($key, $crate::value!(-$num));
        $crate::value!(@struct $map $($($rest)*)?);
    };
    (@struct $map:ident $key:literal : $val:tt $(, $($rest:tt)*)?) => {
        $map.set($key, $crate::value!($val));
        $crate::value!(@struct $map $($($rest)*)?);
    };

    ([]) => {
        $crate::Value::List(Vec::new())
    };

    ([ $($tt:tt)+ ]) => {
        $crate::value!(@list [] $($tt)+)
    };

    ({}) => {
        $crate::Value::Struct($crate::StructMap::new())
    };

    ({ $($tt:tt)+ }) => {{
        let mut map = $crate::StructMap::new();
        $crate::value!(@struct map $($tt)+);
        $crate::Value::Struct(map)
    }};

    (- $num:literal) => {
        $crate::Value::from(-$num)
    };

    ($other:expr) => {
        $crate::Value::from($other)
    };
}
