use std::fmt::Debug;

use crate::ElectionCore;
use crate::StateStorage;
use crate::Transport;

/// **This coding style learned from OpenRaft project type config.**
pub trait TypeConfig:
    Sync + Send + Sized + Debug + Clone + Copy + Default + Eq + PartialEq + Ord + PartialOrd + 'static
{
    type TR: Transport;

    type SS: StateStorage;

    type E: ElectionCore<Self> + Clone;
}

pub mod alias {
    use super::TypeConfig;

    pub type TROF<T> = <T as TypeConfig>::TR;

    pub type SSOF<T> = <T as TypeConfig>::SS;

    pub type EOF<T> = <T as TypeConfig>::E;
}
