//! Call descriptors and per-transaction execution state.

use std::collections::HashMap;

use alloy_primitives::{Address, Bytes, Selector, B256, U256};
use call_firewall_types::{selector_of, vector_hash};

/// A single intercepted call into a protected consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub consumer: Address,
    /// Immediate caller of the consumer.
    pub sender: Address,
    /// Externally owned account that started the transaction.
    pub origin: Address,
    pub data: Bytes,
    pub value: U256,
}

impl CallContext {
    pub fn selector(&self) -> Selector {
        selector_of(&self.data)
    }
}

#[derive(Clone, Debug, Default)]
struct ConsumerFrame {
    depth: u32,
    vector: Vec<Selector>,
}

/// Transaction-scoped bookkeeping: guarded-call depth and the ordered selector vector per consumer.
///
/// Lives for one transaction only and is discarded afterwards, so nothing here needs clearing.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    origin: Address,
    frames: HashMap<Address, ConsumerFrame>,
}

impl ExecutionContext {
    pub fn new(origin: Address) -> Self {
        Self {
            origin,
            frames: HashMap::new(),
        }
    }

    pub fn origin(&self) -> Address {
        self.origin
    }

    /// Record entry into a guarded function of `consumer`.
    pub fn enter(&mut self, consumer: Address, selector: Selector) {
        let frame = self.frames.entry(consumer).or_default();
        frame.depth += 1;
        frame.vector.push(selector);
    }

    /// Record exit; returns `true` when this closed the outermost guarded call.
    pub fn exit(&mut self, consumer: Address) -> bool {
        match self.frames.get_mut(&consumer) {
            Some(frame) if frame.depth > 0 => {
                frame.depth -= 1;
                frame.depth == 0
            }
            _ => false,
        }
    }

    /// Guarded calls of `consumer` currently open, the current one included.
    pub fn depth(&self, consumer: Address) -> u32 {
        self.frames.get(&consumer).map(|f| f.depth).unwrap_or(0)
    }

    pub fn is_outermost(&self, consumer: Address) -> bool {
        self.depth(consumer) == 1
    }

    pub fn vector(&self, consumer: Address) -> &[Selector] {
        self.frames
            .get(&consumer)
            .map(|f| f.vector.as_slice())
            .unwrap_or(&[])
    }

    pub fn vector_hash(&self, consumer: Address) -> B256 {
        vector_hash(self.vector(consumer))
    }
}
