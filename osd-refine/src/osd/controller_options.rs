//! Worker pool configuration shared by the CPU controllers.
use std::num::NonZeroUsize;

/// How many worker threads a controller uses.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ThreadCount {
    /// Use all available hardware threads.
    #[default]
    All,
    /// Use exactly this many threads.
    Fixed(NonZeroUsize),
}

impl ThreadCount {
    /// The sentinel integer selecting [`ThreadCount::All`].
    pub const ALL_SENTINEL: i32 = -1;

    /// Resolve to a concrete thread count.
    pub fn get(self) -> usize {
        match self {
            ThreadCount::All => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            ThreadCount::Fixed(count) => count.get(),
        }
    }
}

/// The single-integer configuration form: any positive number is a fixed
/// count, anything else (canonically [`ThreadCount::ALL_SENTINEL`]) selects
/// all hardware threads.
impl From<i32> for ThreadCount {
    fn from(count: i32) -> Self {
        usize::try_from(count)
            .ok()
            .and_then(NonZeroUsize::new)
            .map_or(ThreadCount::All, ThreadCount::Fixed)
    }
}

/// Options for creating a controller.
///
/// ```
/// use osd_refine::osd::{ControllerOptions, ThreadCount};
///
/// let options = ControllerOptions {
///     thread_count: 4.into(),
///     ..Default::default()
/// };
/// assert_eq!(options.thread_count.get(), 4);
///
/// assert_eq!(ThreadCount::from(-1), ThreadCount::All);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Size of the worker pool.
    pub thread_count: ThreadCount,
    /// Prefix for worker thread names.
    pub thread_name: String,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            thread_count: ThreadCount::All,
            thread_name: "osd-refine".to_string(),
        }
    }
}

impl From<i32> for ControllerOptions {
    fn from(thread_count: i32) -> Self {
        Self {
            thread_count: thread_count.into(),
            ..Default::default()
        }
    }
}

impl ControllerOptions {
    /// Build the fixed-size worker pool these options describe.
    pub(crate) fn build_thread_pool(&self) -> crate::Result<rayon::ThreadPool> {
        let threads = self.thread_count.get();
        let prefix = self.thread_name.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()?;
        log::debug!("Created worker pool with {} threads", pool.current_num_threads());
        Ok(pool)
    }
}
