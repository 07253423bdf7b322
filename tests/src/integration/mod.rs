//! Cross-crate scenarios.

#[cfg(test)]
mod harness;

#[cfg(test)]
mod anchoring;
#[cfg(test)]
mod node_loop;
#[cfg(test)]
mod ordering;
#[cfg(test)]
mod reorg;
