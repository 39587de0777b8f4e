// Stepper display model

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepIndicator {
    pub number: usize,
    pub description: String,
    /// Already passed.
    pub completed: bool,
    /// The step the user is on.
    pub highlighted: bool,
    /// Passed or current; drives the filled circle.
    pub selected: bool,
}

impl StepIndicator {
    /// Only the current step shows its title under the circle.
    pub fn label_visible(&self) -> bool {
        self.highlighted
    }
}

/// Indicators for `titles` with `current` as the 1-based active step.
pub fn stepper_view<S: AsRef<str>>(titles: &[S], current: usize) -> Vec<StepIndicator> {
    titles
        .iter()
        .enumerate()
        .map(|(index, title)| {
            let number = index + 1;
            StepIndicator {
                number,
                description: title.as_ref().to_string(),
                completed: number < current,
                highlighted: number == current,
                selected: number <= current,
            }
        })
        .collect()
}
