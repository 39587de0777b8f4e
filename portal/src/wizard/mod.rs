// Multi-step request wizard.
//
// Groups push edits into a shared draft, the controller gates Next on the
// current step's completion, and the commit routine runs once when the user
// confirms the second-to-last step.

pub mod catalog;
pub mod commit;
pub mod controller;
pub mod draft;
pub mod files;
pub mod group;
pub mod page;
pub mod step;
pub mod stepper;
