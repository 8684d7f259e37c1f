pub mod death;
pub mod merge;

pub use death::{author_death_clip, create_death_animation, RigError, DEATH_ACTION};
pub use merge::{merge_animation_files, merge_animations, MergeError, MergeSource};
