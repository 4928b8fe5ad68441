//! Lazy, single-owner asynchronous tasks that produce exactly one value or exactly one error,
//! and that hand control directly from one task to the next when they await each other.
//!
//! A [`Task`] is created suspended: calling a function that returns a task runs none of its
//! body. The body starts when the task is awaited, runs until it returns a value, returns an
//! error, or panics, and that single outcome is delivered to the one party awaiting it.
//!
//! # Installation
//! Add to your source code
//!
//! ```sh
//! cargo add cotask
//! ```
//!
//! # Example
//!
//! ```rust
//! use cotask::{block_on, Task};
//!
//! fn fib(n: u64) -> Task<u64> {
//!     Task::new(async move {
//!         if n <= 1 {
//!             return Ok(n);
//!         }
//!         Ok(fib(n - 1).await? + fib(n - 2).await?)
//!     })
//! }
//!
//! assert_eq!(block_on(fib(10)).unwrap(), 55);
//! ```
//!
//! # Usage
//!
//! To properly use this crate
//! * ``Task::new`` wraps the body of an asynchronous function. The body's output is a
//!   ``cotask::Result<T>``; ``Ok`` becomes the task's value and ``Err`` its error.
//!   See [`Task`] for more information
//!
//! * ``.await`` a task inside another task's body to get its value, or have its error
//!   handed to you where ``?`` propagates it further. See [`Awaiter`] for more information
//!
//! * ``block_on`` drives a root task, or any future, on the current thread.
//!   See [`block_on`] for more information
//!
//! * ``Driver`` drives a root task from any other executor, with a configurable budget.
//!   See [`Driver`] and [`DriverConfig`] for more information
//!
//! * ``Task::release`` hands the task to a driver loop of your own, stepping frames with
//!   [`FrameRef::resume`]. See [`RawTask`] for more information
//!
//! # Laziness
//!
//! Nothing in a task's body runs before the task is awaited. Dropping a task that was never
//! awaited runs none of it, and dropping a task that is suspended somewhere in its body
//! drops the body's locals right there without running any more of it.
//!
//! # Chaining
//!
//! When a body awaits a task, the driver running the body transfers control to the awaited
//! task from its own loop, and transfers back to the body when that task completes. Polls
//! never nest, so long chains of tasks awaiting tasks run in constant stack space:
//!
//! ```rust
//! use cotask::{block_on, Task};
//!
//! fn depth(n: u32) -> Task<u32> {
//!     Task::new(async move {
//!         if n == 0 {
//!             return Ok(0);
//!         }
//!         Ok(depth(n - 1).await? + 1)
//!     })
//! }
//!
//! assert_eq!(block_on(depth(100_000)).unwrap(), 100_000);
//! ```
//!
//! # Errors
//!
//! An error raised by a body is stored, not propagated, and handed to the awaiting party
//! when it reads the result. Panics inside a body are caught the same way and arrive as a
//! [`Panicked`] error.
//!
//! ```rust
//! use cotask::{anyhow, block_on, Task};
//!
//! let failing: Task = Task::new(async { Err(anyhow!("boom")) });
//! let error = block_on(failing).unwrap_err();
//! assert_eq!(error.to_string(), "boom");
//! ```
//!
//! Breaking the task contract, such as awaiting an empty handle or reading a result twice,
//! is a programming error and panics with a [`UsageError`] payload.
//!
//! # Warning
//! * A task body may await one task at a time; joining several tasks is left to other crates
//! * Only one thread may resume a given task at any instant
//! * ``block_on`` called from inside a task's body blocks the thread driving that body

mod error;
mod executors;
mod task;
mod yield_now;

pub use anyhow::anyhow;
pub use error::{Error, Panicked, Result, UsageError};
pub use executors::{block_on, Driver, DriverBuilder, DriverConfig};
pub use task::{Awaiter, FrameRef, RawTask, Step, Task, TaskId};
pub use yield_now::{yield_now, YieldNow};
