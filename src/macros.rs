/// Builds a [`Params`](crate::record::Params) set from literal entries.
///
/// Entries are inserted in the order written, which is the order they render
/// in once merged into an [`ErrorRecord`](crate::record::ErrorRecord).
///
/// # Examples
///
/// ```
/// use faultline::params;
///
/// let empty = params! {};
/// assert!(empty.is_empty());
///
/// let params = params! {
///     "request_id" => "42",
///     "route" => "/checkout",
/// };
/// assert_eq!(params.get("request_id"), Some("42"));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::record::Params::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::record::Params::new();
        $(
            params.insert($key, $value);
        )+
        params
    }};
}
