// Emits a `tracing` event when the `tracing` feature is enabled; compiles to nothing otherwise.
macro_rules! obs_event {
	($level:ident, $($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		{
			tracing::$level!($($arg)+);
		}
	};
}
