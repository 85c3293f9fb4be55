pub(crate) mod chain;

pub(crate) mod faulty_db;

pub(crate) mod logging;
