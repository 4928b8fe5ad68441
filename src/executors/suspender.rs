use std::{sync::Arc, task::Waker};

use cooked_waker::{IntoWaker, WakeRef};
use parking_lot::{Condvar, Mutex};

pub(crate) fn pair() -> (Arc<Suspender>, Waker) {
    let suspender: Arc<Suspender> = Arc::new(Suspender::new());
    let waker: Waker = suspender.clone().into_waker();
    (suspender, waker)
}

/// Parks the thread running [`block_on`](crate::block_on) until its waker fires.
pub(crate) struct Suspender {
    lock: Mutex<State>,
    cvar: Condvar,
}

#[derive(Debug, PartialEq)]
enum State {
    Initial,
    Notified,
    Suspended,
}

impl Suspender {
    pub(crate) fn new() -> Suspender {
        Suspender {
            lock: Mutex::new(State::Initial),
            cvar: Condvar::new(),
        }
    }

    pub(crate) fn suspend(&self) {
        // take the lock before looking at the state
        let mut state = self.lock.lock();

        match *state {
            // nobody woke us yet, so park
            State::Initial => {
                *state = State::Suspended;
                // park until a wake flips the state, spurious wakeups loop back
                while *state == State::Suspended {
                    self.cvar.wait(&mut state);
                }
                // ready for the next round of block_on polls
                *state = State::Initial;
            }
            // woken before we got here, nothing to wait for
            State::Notified => *state = State::Initial,
            State::Suspended => {
                panic!("cannot suspend a thread that is already in a suspended state")
            }
        }
    }

    pub(crate) fn resume(&self) {
        // take the lock before looking at the state
        let mut state = self.lock.lock();

        match *state {
            // not parked yet, leave a note for the next suspend
            State::Initial => *state = State::Notified,
            // parked, so flip the state and send the notification
            State::Suspended => {
                *state = State::Notified;
                self.cvar.notify_one();
            }
            // a wake is already pending
            State::Notified => {}
        }
    }
}

impl WakeRef for Suspender {
    fn wake_by_ref(&self) {
        self.resume();
    }
}
