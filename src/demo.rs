//! One run per component, printing what happens along the way.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering::Relaxed},
        Arc,
    },
    time::{Duration, Instant},
};

use strum::IntoEnumIterator;
use threads_n_traces::{
    diagnosis::{
        ArgumentTrace, CallStackTracePrinter, CallStackTracer, CallTrace, ConsolePrinter,
        LogPrinter,
    },
    error::JoinError,
    sync::{
        ConditionVariable, Mutex, RecursiveMutex, ScopedLock, ScopedLockPair, ScopedSharedLock,
        SharedMutex,
    },
    thread::{priority::ThreadPriority, this_thread, Thread},
    trace_callstack, trace_method,
};

fn join(thread: &mut Thread) -> Result<(), String> {
    thread.join().map_err(|e| e.to_string())
}

pub fn mutexes() -> Result<(), String> {
    // 4 threads bump a counter under a mutex, one at a time
    let mutex = Arc::new(Mutex::new());
    let counter = Arc::new(AtomicU32::new(0));
    let mut threads: Vec<Thread> = (0..4)
        .map(|_| {
            let (mutex, counter) = (mutex.clone(), counter.clone());
            Thread::spawn(move || {
                for _ in 0..1000 {
                    let _lock = ScopedLock::new(&*mutex);
                    let value = counter.load(Relaxed);
                    counter.store(value + 1, Relaxed);
                }
            })
        })
        .collect();
    for thread in threads.iter_mut() {
        join(thread)?;
    }
    println!("mutex: 4 threads x 1000 increments = {}", counter.load(Relaxed));

    // the owner can come back for more
    let recursive = RecursiveMutex::new();
    recursive.lock();
    recursive.lock();
    println!("recursive mutex: locked {} times by the same thread", recursive.depth());
    recursive.unlock();
    recursive.unlock();

    // readers share, a writer waits for them
    let shared = SharedMutex::new();
    {
        let _first = ScopedSharedLock::new(&shared);
        let _second = ScopedSharedLock::new(&shared);
        println!(
            "shared mutex: {} readers, a writer gets in: {}",
            shared.shared_count(),
            shared.try_lock()
        );
    }
    let writer_got_in = shared.try_lock();
    println!("shared mutex: readers gone, a writer gets in: {writer_got_in}");
    if writer_got_in {
        shared.unlock();
    }
    Ok(())
}

pub fn lock_pair() -> Result<(), String> {
    // taking the same 2 mutexes in opposite orders would deadlock with plain locks
    let mutexes = Arc::new((Mutex::new(), Mutex::new()));
    let started = Instant::now();
    let mut threads: Vec<Thread> = [false, true]
        .into_iter()
        .map(|reversed| {
            let mutexes = mutexes.clone();
            Thread::spawn(move || {
                let (a, b) = &*mutexes;
                for _ in 0..10_000 {
                    let _pair = if reversed {
                        ScopedLockPair::new(b, a)
                    } else {
                        ScopedLockPair::new(a, b)
                    };
                }
            })
        })
        .collect();
    for thread in threads.iter_mut() {
        join(thread)?;
    }
    println!("lock pair: 2 x 10000 opposite-order locks in {:?}", started.elapsed());
    Ok(())
}

pub fn condvar() -> Result<(), String> {
    let shared = Arc::new((Mutex::new(), ConditionVariable::new(), AtomicBool::new(false)));

    let in_thread = shared.clone();
    let mut waiter = Thread::spawn(move || {
        let (mutex, condvar, ready) = &*in_thread;
        let mut lock = ScopedLock::new(mutex);
        let mut wakeups = 0;
        while !ready.load(Relaxed) {
            if condvar.wait(&mut lock).is_err() {
                println!("condvar: the waiter got interrupted");
                return;
            }
            wakeups += 1;
        }
        println!("condvar: the waiter saw the flag after {wakeups} wake up(s)");
    });

    this_thread::sleep(Duration::from_millis(100)).map_err(|e| e.to_string())?;
    {
        let (mutex, condvar, ready) = &*shared;
        let _lock = ScopedLock::new(mutex);
        ready.store(true, Relaxed);
        condvar.notify_one();
    }
    join(&mut waiter)
}

pub fn threads() -> Result<(), String> {
    let mut worker = Thread::builder()
        .name("sleeper")
        .spawn(|| {
            this_thread::set_exit_function(|| {
                println!("threads: exit function of {}", this_thread::to_string())
            });
            match this_thread::sleep(Duration::from_secs(60)) {
                Ok(()) => println!("threads: slept the whole minute"),
                Err(e) => println!("threads: {}: {e}", this_thread::to_string()),
            }
        })
        .map_err(|e| e.to_string())?;
    println!("threads: started {worker}, alive: {}", worker.is_alive());

    this_thread::sleep(Duration::from_millis(50)).map_err(|e| e.to_string())?;
    worker.interrupt();
    join(&mut worker)?;
    println!("threads: joined, alive: {}", worker.is_alive());

    let mut failing = Thread::spawn(|| panic!("on purpose"));
    match failing.join() {
        Err(JoinError::Panicked(message)) => {
            println!("threads: the other one panicked with '{message}'")
        }
        other => return Err(format!("unexpected join result {other:?}")),
    }
    Ok(())
}

pub fn priorities() -> Result<(), String> {
    let stop = Arc::new(AtomicBool::new(false));
    let in_thread = stop.clone();
    let mut thread = Thread::spawn(move || {
        while !in_thread.load(Relaxed) {
            std::thread::sleep(Duration::from_millis(1));
        }
    });

    println!("priorities: {thread} starts with {}", thread.priority());
    for level in ThreadPriority::iter() {
        // refusals show up as warnings
        thread.set_priority(level);
        println!("priorities: asked for {level}, got {}", thread.priority());
    }
    println!("priorities: this thread has {}", this_thread::priority());

    stop.store(true, Relaxed);
    join(&mut thread)
}

struct Account {
    balance: i64,
}

impl Account {
    fn deposit(&mut self, amount: i64) {
        trace_method!(Account, state = format!("balance={}", self.balance), amount);
        self.balance += amount;
        audit(self.balance);
    }
}

fn audit(balance: i64) {
    trace_callstack!(balance);
    CallStackTracer::get().dump();
}

pub fn call_stack() -> Result<(), String> {
    let tracer = CallStackTracer::get();
    tracer.set_printer(Some(Arc::new(ConsolePrinter::new()) as Arc<dyn CallStackTracePrinter>));

    {
        trace_callstack!();
        let mut account = Account { balance: 10 };
        account.deposit(5);
    }
    // everything got popped
    tracer.dump();

    // another thread's stack, after it's gone
    tracer.set_printer(Some(Arc::new(LogPrinter::new()) as Arc<dyn CallStackTracePrinter>));
    let (sender, receiver) = std::sync::mpsc::channel();
    let mut worker = Thread::spawn(move || {
        // never removed, as if the thread died in the middle of the call
        CallStackTracer::get().add_trace(CallTrace::new(
            "worker()",
            vec![ArgumentTrace::new("left behind")],
        ));
        let _ = sender.send(this_thread::id());
    });
    join(&mut worker)?;
    let id = receiver.recv().map_err(|e| e.to_string())?;
    tracer.dump_thread(id);
    Ok(())
}
