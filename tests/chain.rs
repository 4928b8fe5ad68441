use std::{
    future::IntoFuture,
    io,
    sync::{Arc, Mutex},
    thread,
};

use cotask::{block_on, yield_now, Driver, DriverConfig, Task};

const DEPTH: u32 = 100_000;

// far too small for DEPTH nested polls
const SMALL_STACK: usize = 512 * 1024;

fn depth(n: u32) -> Task<u32> {
    Task::new(async move {
        if n == 0 {
            return Ok(0);
        }
        Ok(depth(n - 1).await? + 1)
    })
}

fn yielding_depth(n: u32) -> Task<u32> {
    Task::new(async move {
        if n == 0 {
            yield_now().await;
            return Ok(0);
        }
        if n % 1_000 == 0 {
            yield_now().await;
        }
        Ok(yielding_depth(n - 1).await? + 1)
    })
}

fn on_small_stack<R: Send + 'static>(run: impl FnOnce() -> R + Send + 'static) -> R {
    thread::Builder::new()
        .name("small-stack".to_owned())
        .stack_size(SMALL_STACK)
        .spawn(run)
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn deep_chain_runs_in_constant_stack() {
    let value = on_small_stack(|| block_on(depth(DEPTH)).unwrap());
    assert_eq!(value, DEPTH);
}

#[test]
fn deep_chain_with_suspensions_along_the_way() {
    let value = on_small_stack(|| block_on(yielding_depth(DEPTH)).unwrap());
    assert_eq!(value, DEPTH);
}

#[test]
fn deep_chain_under_a_budget() {
    let value = on_small_stack(|| {
        let config: DriverConfig = DriverConfig::builder().transfer_budget(64).build();
        block_on(Driver::with_config(depth(DEPTH), config)).unwrap()
    });
    assert_eq!(value, DEPTH);
}

#[test]
fn deep_chain_on_a_foreign_executor() {
    let value = on_small_stack(|| futures_lite::future::block_on(depth(DEPTH).into_future()));
    assert_eq!(value.unwrap(), DEPTH);
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn lifecycle_is_traced() {
    let capture: Capture = Capture::default();
    let writer: Capture = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let value = tracing::subscriber::with_default(subscriber, || block_on(depth(2)).unwrap());
    assert_eq!(value, 2);

    let output: String = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    assert_eq!(output.matches("task created").count(), 3);
    assert_eq!(output.matches("task started").count(), 3);
    assert_eq!(output.matches("task completed").count(), 3);
    assert_eq!(output.matches("transfer into awaited task").count(), 2);
}
