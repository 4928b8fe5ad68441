use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc, Arc,
    },
    task::Poll,
    thread,
};

use cotask::{anyhow, block_on, yield_now, Driver, FrameRef, RawTask, Step, Task};
use threadpool::ThreadPool;

fn summed(values: Vec<u32>) -> Task<u32> {
    Task::new(async move {
        let mut total: u32 = 0;
        for value in values {
            yield_now().await;
            total += single(value).await?;
        }
        Ok(total)
    })
}

fn single(value: u32) -> Task<u32> {
    Task::new(async move {
        if value == 13 {
            return Err(anyhow!("unlucky {value}"));
        }
        Ok(value)
    })
}

/// Steps the released task from a loop of our own, the way an outside driver would
fn drive_by_hand<T: Send + 'static>(raw: &RawTask<T>) -> cotask::Result<T> {
    let mut current: Option<FrameRef> = None;
    futures_lite::future::block_on(futures_lite::future::poll_fn(|cx| {
        let mut frame: FrameRef = current.take().unwrap_or_else(|| raw.begin());
        loop {
            match frame.resume(cx) {
                Step::Transfer(next) => frame = next,
                Step::Suspended => {
                    current = Some(frame);
                    return Poll::Pending;
                }
                Step::Finished => return Poll::Ready(()),
            }
        }
    }));
    assert!(raw.is_done());
    raw.take_result()
}

fn resume_once(frame: &FrameRef) -> Step {
    futures_lite::future::block_on(futures_lite::future::poll_fn(|cx| {
        Poll::Ready(frame.resume(cx))
    }))
}

#[test]
fn released_task_matches_awaited_task() {
    let awaited = block_on(summed(vec![1, 2, 3])).unwrap();

    let mut task = summed(vec![1, 2, 3]);
    let raw: RawTask<u32> = task.release();
    assert!(!task.is_valid());
    let by_hand = drive_by_hand(&raw).unwrap();
    raw.destroy();

    assert_eq!(awaited, 6);
    assert_eq!(by_hand, awaited);
}

#[test]
fn released_task_matches_awaited_error() {
    let awaited = block_on(summed(vec![1, 13, 3])).unwrap_err();

    let raw: RawTask<u32> = summed(vec![1, 13, 3]).release();
    let by_hand = drive_by_hand(&raw).unwrap_err();
    raw.destroy();

    assert_eq!(awaited.to_string(), "unlucky 13");
    assert_eq!(by_hand.to_string(), awaited.to_string());
}

#[test]
fn released_task_resumes_on_another_thread() {
    let pool: ThreadPool = ThreadPool::new(2);
    let (sender, receiver) = mpsc::channel();

    for values in [vec![2, 4], vec![5, 13], vec![]] {
        let raw: RawTask<u32> = summed(values).release();
        let sender = sender.clone();
        pool.execute(move || {
            let outcome = block_on(Driver::from_raw(raw)).map_err(|error| error.to_string());
            sender.send(outcome).unwrap();
        });
    }
    drop(sender);

    let mut outcomes: Vec<Result<u32, String>> = receiver.iter().collect();
    outcomes.sort();
    assert_eq!(
        outcomes,
        vec![Ok(0), Ok(6), Err("unlucky 13".to_owned())]
    );
    pool.join();
}

#[test]
fn task_moves_between_threads_while_suspended() {
    let resumed = Arc::new(AtomicUsize::new(0));
    let counter = resumed.clone();
    let mut task: Task<usize> = Task::new(async move {
        yield_now().await;
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    });
    let raw: RawTask<usize> = task.release();

    let frame: FrameRef = raw.begin();
    assert!(matches!(resume_once(&frame), Step::Suspended));
    assert_eq!(resumed.load(Ordering::SeqCst), 0);

    let (raw, step) = thread::spawn(move || {
        let step = resume_once(&frame);
        (raw, step)
    })
    .join()
    .unwrap();
    assert!(matches!(step, Step::Finished));
    assert_eq!(resumed.load(Ordering::SeqCst), 1);
    assert_eq!(raw.take_result().unwrap(), 1);
    raw.destroy();
}

#[test]
fn resuming_a_caller_early_sends_control_back_to_its_callee() {
    let inner: Task<i32> = Task::new(async {
        yield_now().await;
        Ok(41)
    });
    let inner_id = inner.id().unwrap();
    let mut outer: Task<i32> = Task::new(async move { Ok(inner.await? + 1) });
    let raw: RawTask<i32> = outer.release();

    let root: FrameRef = raw.begin();
    let callee: FrameRef = match resume_once(&root) {
        Step::Transfer(next) => next,
        other => panic!("expected a transfer, got {other:?}"),
    };
    assert_eq!(callee.id(), inner_id);
    assert!(matches!(resume_once(&callee), Step::Suspended));

    // the callee is still suspended, so the caller hands control straight back
    match resume_once(&root) {
        Step::Transfer(next) => assert_eq!(next.id(), inner_id),
        other => panic!("expected a transfer, got {other:?}"),
    }

    let back: FrameRef = match resume_once(&callee) {
        Step::Transfer(next) => next,
        other => panic!("expected a transfer, got {other:?}"),
    };
    assert_eq!(back.id(), raw.id());
    assert!(matches!(resume_once(&back), Step::Finished));
    assert_eq!(raw.take_result().unwrap(), 42);
    raw.destroy();
}

#[test]
fn destroying_a_suspended_task_drops_its_locals() {
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    let dropped = Arc::new(AtomicBool::new(false));
    let after = Arc::new(AtomicUsize::new(0));
    let guard = DropFlag(dropped.clone());
    let counter = after.clone();
    let raw: RawTask<()> = Task::new(async move {
        let _guard = guard;
        yield_now().await;
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .release();

    let frame: FrameRef = raw.begin();
    assert!(matches!(resume_once(&frame), Step::Suspended));
    assert!(!raw.is_done());
    assert!(!dropped.load(Ordering::SeqCst));

    raw.destroy();
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(after.load(Ordering::SeqCst), 0);
}
