//! Probabilistic graphical models over discrete `Variable`s.

pub mod bayes_net;

pub use self::bayes_net::{BayesNet, BayesNetBuilder};
