use std::num::NonZeroUsize;

const DEFAULT_TRANSFER_BUDGET: usize = 4096;

/// Settings of a [`Driver`](crate::Driver).
///
/// # Example
///
/// ```rust
/// use cotask::DriverConfig;
///
/// let config = DriverConfig::builder().transfer_budget(64).build();
/// assert_eq!(config.transfer_budget(), Some(64));
///
/// let unbounded = DriverConfig::builder().unbounded().build();
/// assert_eq!(unbounded.transfer_budget(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    transfer_budget: Option<NonZeroUsize>,
}

impl DriverConfig {
    /// Starts a builder holding the default settings
    pub fn builder() -> DriverBuilder {
        DriverBuilder::new()
    }

    /// Number of frame-to-frame transfers a driver performs in one poll before it wakes
    /// itself and yields to the executor polling it. `None` means it never yields on its
    /// own.
    pub fn transfer_budget(&self) -> Option<usize> {
        self.transfer_budget.map(NonZeroUsize::get)
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverBuilder::new().build()
    }
}

/// Builder for [`DriverConfig`].
#[derive(Debug, Clone)]
pub struct DriverBuilder {
    transfer_budget: Option<NonZeroUsize>,
}

impl DriverBuilder {
    pub fn new() -> Self {
        Self {
            transfer_budget: NonZeroUsize::new(DEFAULT_TRANSFER_BUDGET),
        }
    }

    /// Sets the number of transfers performed per poll.
    ///
    /// # Panics
    /// If `transfers` is zero.
    pub fn transfer_budget(mut self, transfers: usize) -> Self {
        assert!(transfers > 0, "transfer_budget must be > 0");

        self.transfer_budget = NonZeroUsize::new(transfers);
        self
    }

    /// Lets the driver run until the chain suspends or finishes, however many transfers
    /// that takes
    pub fn unbounded(mut self) -> Self {
        self.transfer_budget = None;
        self
    }

    pub fn build(self) -> DriverConfig {
        DriverConfig {
            transfer_budget: self.transfer_budget,
        }
    }
}

impl Default for DriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget() {
        assert_eq!(
            DriverConfig::default().transfer_budget(),
            Some(DEFAULT_TRANSFER_BUDGET)
        );
    }

    #[test]
    #[should_panic(expected = "transfer_budget must be > 0")]
    fn zero_budget_is_rejected() {
        let _ = DriverBuilder::new().transfer_budget(0);
    }
}
