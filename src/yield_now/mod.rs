pub use self::yielder::YieldNow;

mod yielder;

/// Suspends the current task body once.
///
/// The returned future wakes its own waker and returns [`std::task::Poll::Pending`] on the
/// first poll, then completes on the next one. Inside a task this suspends the body
/// without transferring control anywhere, so the driver returns to whatever is polling it
/// and resumes the same body afterwards.
///
/// # Examples
/// ```
/// use cotask::{block_on, yield_now, Task};
///
/// let task: Task<u8> = Task::new(async {
///     yield_now().await;
///     Ok(1)
/// });
/// assert_eq!(block_on(task).unwrap(), 1);
/// ```
pub fn yield_now() -> YieldNow {
    YieldNow::default()
}
