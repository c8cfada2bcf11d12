extern crate chrono;
extern crate std;

use crate::result;

pub trait Clock {
    fn now(&self) -> chrono::DateTime<chrono::Utc>;
    fn sleep(&self, duration: std::time::Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        return chrono::Utc::now();
    }

    fn sleep(&self, duration: std::time::Duration) {
        std::thread::sleep(duration);
    }
}

type TaskFn<Ctx> = Box<dyn FnMut(&mut Ctx, &chrono::DateTime<chrono::Utc>) -> result::BusDashResult<()>>;

struct Task<Ctx> {
    name: String,
    interval: chrono::Duration,
    // None until the first run, so every task runs once at startup.
    next_run: Option<chrono::DateTime<chrono::Utc>>,
    run_fn: TaskFn<Ctx>,
}

/// Runs interval tasks one at a time on the calling thread.
///
/// A task is re-armed `interval` after its previous run *finished*, so a
/// slow run pushes the next one back rather than piling up. When two
/// tasks are due at the same time they run in registration order.
pub struct Scheduler<Ctx> {
    tasks: Vec<Task<Ctx>>,
}

impl<Ctx> Scheduler<Ctx> {
    pub fn new() -> Scheduler<Ctx> {
        return Scheduler{
            tasks: vec![],
        };
    }

    pub fn every<F>(&mut self, name: &str, interval: std::time::Duration, run_fn: F)
    where F: FnMut(&mut Ctx, &chrono::DateTime<chrono::Utc>) -> result::BusDashResult<()> + 'static {
        self.tasks.push(Task{
            name: name.to_string(),
            interval: chrono::Duration::milliseconds(interval.as_millis() as i64),
            next_run: None,
            run_fn: Box::new(run_fn),
        });
    }

    pub fn task_names(&self) -> Vec<&str> {
        return self.tasks.iter().map(|task| task.name.as_str()).collect();
    }

    /// Sleeps until the next task is due and runs it. Returns false if
    /// there is nothing scheduled.
    pub fn run_next<C: Clock>(&mut self, ctx: &mut Ctx, clock: &C) -> bool {
        let next = self.tasks.iter()
            .enumerate()
            .min_by_key(|(_, task)| task.next_run)
            .map(|(i, _)| i);

        let task = match next {
            Some(i) => &mut self.tasks[i],
            None => return false,
        };

        if let Some(due) = task.next_run {
            let now = clock.now();
            if due > now {
                if let Ok(wait) = (due - now).to_std() {
                    clock.sleep(wait);
                }
            }
        }

        let now = clock.now();
        trace!("Running task '{}'", task.name);
        if let Err(err) = (task.run_fn)(ctx, &now) {
            error!("Task '{}' failed: {}", task.name, err);
        }

        task.next_run = Some(clock.now() + task.interval);
        return true;
    }

    /// Runs tasks until `max_runs` task executions have happened, or
    /// forever if it is None.
    pub fn run<C: Clock>(&mut self, ctx: &mut Ctx, clock: &C, max_runs: Option<u64>) {
        let mut runs = 0;
        loop {
            if let Some(max_runs) = max_runs {
                if runs >= max_runs {
                    return;
                }
            }

            if !self.run_next(ctx, clock) {
                warn!("Nothing scheduled");
                return;
            }
            runs = runs + 1;
        }
    }
}
