pub(crate) mod check;
pub(crate) mod export;
pub(crate) mod helpers;
pub(crate) mod show;
pub(crate) mod simulate;
