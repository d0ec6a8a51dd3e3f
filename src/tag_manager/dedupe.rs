//! "Last emitted value" comparator shared by consent and page-view suppression.

use std::fmt;

type Equality<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync + 'static>;

/// Remembers the last admitted value and rejects values equal to it.
///
/// With [`LastValueGate::with_baseline`] the first observation is stored without being admitted,
/// so only later changes pass.
pub struct LastValueGate<T> {
    last: Option<T>,
    equals: Equality<T>,
    baseline_first: bool,
}

impl<T> LastValueGate<T> {
    pub fn new<F>(equals: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            last: None,
            equals: Box::new(equals),
            baseline_first: false,
        }
    }

    pub fn with_baseline(mut self) -> Self {
        self.baseline_first = true;
        self
    }

    /// Records `value` and returns whether it should be emitted.
    pub fn admit(&mut self, value: T) -> bool {
        match &self.last {
            None => {
                self.last = Some(value);
                !self.baseline_first
            }
            Some(last) if (self.equals)(last, &value) => false,
            Some(_) => {
                self.last = Some(value);
                true
            }
        }
    }

    pub fn last(&self) -> Option<&T> {
        self.last.as_ref()
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl<T: PartialEq + 'static> LastValueGate<T> {
    pub fn by_eq() -> Self {
        Self::new(|a: &T, b: &T| a == b)
    }
}

impl<T: fmt::Debug> fmt::Debug for LastValueGate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LastValueGate")
            .field("last", &self.last)
            .field("baseline_first", &self.baseline_first)
            .finish()
    }
}
