//! Utility functions for the container

/// Naming utilities
pub mod naming {
    /// Strips the module path from a Rust type name.
    ///
    /// Generic parameters are dropped along with the path, so the result is
    /// the bare identifier a configuration file would use as `class`.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_core::utils::naming::short_type_name;
    ///
    /// assert_eq!(short_type_name("alloc::string::String"), "String");
    /// assert_eq!(short_type_name("app::service::UserService"), "UserService");
    /// assert_eq!(short_type_name("alloc::vec::Vec<alloc::string::String>"), "Vec");
    /// assert_eq!(short_type_name("Plain"), "Plain");
    /// ```
    pub fn short_type_name(full: &str) -> &str {
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }
}

/// Dependency resolution utilities
pub mod dependency {
    use std::collections::HashMap;
    use std::thread::{self, ThreadId};

    use parking_lot::Mutex;

    /// Tracks beans currently being created to detect circular dependencies.
    ///
    /// Each thread has its own creation chain, kept in the order creation
    /// started. A bean being built on another thread is not a cycle.
    #[derive(Debug, Default)]
    pub struct CreationTracker {
        creating: Mutex<HashMap<ThreadId, Vec<String>>>,
    }

    impl CreationTracker {
        /// Creates a new empty creation tracker.
        pub fn new() -> Self {
            Self::default()
        }

        /// Marks a bean as being created on the current thread.
        ///
        /// Returns a guard that clears the mark when dropped, or `None` if the
        /// current thread is already creating this bean (circular dependency detected).
        pub fn start_creating(&self, name: &str) -> Option<CreationGuard<'_>> {
            let thread = thread::current().id();
            let mut creating = self.creating.lock();
            let chain = creating.entry(thread).or_default();
            if chain.iter().any(|n| n == name) {
                return None;
            }
            chain.push(name.to_string());

            Some(CreationGuard {
                tracker: self,
                thread,
                name: name.to_string(),
            })
        }

        fn finish_creating(&self, thread: ThreadId, name: &str) {
            let mut creating = self.creating.lock();
            if let Some(chain) = creating.get_mut(&thread) {
                if let Some(pos) = chain.iter().rposition(|n| n == name) {
                    chain.remove(pos);
                }
                if chain.is_empty() {
                    creating.remove(&thread);
                }
            }
        }

        /// Gets the current thread's creation chain, outermost first.
        pub fn current_creating(&self) -> Vec<String> {
            self.creating
                .lock()
                .get(&thread::current().id())
                .cloned()
                .unwrap_or_default()
        }
    }

    /// Clears a bean's in-progress mark when dropped, on success and error paths alike.
    #[derive(Debug)]
    pub struct CreationGuard<'a> {
        tracker: &'a CreationTracker,
        thread: ThreadId,
        name: String,
    }

    impl Drop for CreationGuard<'_> {
        fn drop(&mut self) {
            self.tracker.finish_creating(self.thread, &self.name);
        }
    }
}
