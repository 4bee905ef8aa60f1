//! Symbol alphabet and sequence encoding.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{HmmError, Result};

/// Ordered set of unique symbols; a symbol's position is its emission column.
#[derive(Debug, Clone)]
pub struct Alphabet<S>
where
    S: Clone + Eq + Hash,
{
    symbols: Vec<S>,
    symbol_to_idx: HashMap<S, usize>,
}

impl<S> Alphabet<S>
where
    S: Clone + Eq + Hash + Debug,
{
    /// Build an alphabet from an explicit, duplicate-free symbol list.
    pub fn new(symbols: Vec<S>) -> Result<Self> {
        if symbols.is_empty() {
            return Err(HmmError::InvalidInput("alphabet is empty".into()));
        }

        let mut symbol_to_idx = HashMap::with_capacity(symbols.len());
        for (idx, symbol) in symbols.iter().enumerate() {
            if symbol_to_idx.insert(symbol.clone(), idx).is_some() {
                return Err(HmmError::InvalidInput(format!(
                    "alphabet contains duplicate symbol {:?}",
                    symbol
                )));
            }
        }

        Ok(Self {
            symbols,
            symbol_to_idx,
        })
    }

    /// Derive the alphabet from a sequence, in order of first occurrence.
    pub fn from_sequence(sequence: &[S]) -> Result<Self> {
        if sequence.is_empty() {
            return Err(HmmError::InvalidInput("sequence is empty".into()));
        }

        let mut symbols = Vec::new();
        let mut symbol_to_idx = HashMap::new();
        for symbol in sequence {
            if !symbol_to_idx.contains_key(symbol) {
                symbol_to_idx.insert(symbol.clone(), symbols.len());
                symbols.push(symbol.clone());
            }
        }

        Ok(Self {
            symbols,
            symbol_to_idx,
        })
    }

    /// Replace every symbol with its index.
    pub fn encode(&self, sequence: &[S]) -> Result<Vec<usize>> {
        if sequence.is_empty() {
            return Err(HmmError::InvalidInput("sequence is empty".into()));
        }

        sequence
            .iter()
            .enumerate()
            .map(|(position, symbol)| {
                self.index_of(symbol)
                    .ok_or(HmmError::UnknownSymbol { position })
            })
            .collect()
    }

    /// Map indices back to symbols.
    pub fn decode(&self, indices: &[usize]) -> Result<Vec<S>> {
        indices
            .iter()
            .map(|&idx| {
                self.symbol(idx).cloned().ok_or(HmmError::DimensionMismatch {
                    what: "observation index",
                    expected: self.symbols.len(),
                    found: idx,
                })
            })
            .collect()
    }

    pub fn index_of(&self, symbol: &S) -> Option<usize> {
        self.symbol_to_idx.get(symbol).copied()
    }

    pub fn symbol(&self, idx: usize) -> Option<&S> {
        self.symbols.get(idx)
    }

    pub fn symbols(&self) -> &[S] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn into_symbols(self) -> Vec<S> {
        self.symbols
    }
}
