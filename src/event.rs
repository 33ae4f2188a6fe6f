//! Event handling.
//!
//! This library exposes an event-based interface for observing the execution of a fragment
//! program as it happens. [EventListeners](EventListener) can be registered on the
//! [Interpreter](crate::interpreter::Interpreter) with the
//! [add_listener](crate::interpreter::Interpreter::add_listener) method.
//!
//! Events are only emitted for the fragment's own run of the program, not for the runs the
//! interpreter makes internally to compute derivatives.
//!
//! A blanket implementation of [EventListener] for all `Fn(&Event)` is provided.

use crate::instruction::{OpCode, RegisterFile, Vec4};

/// Represents an event that occurred while executing a program.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// An instruction is about to be executed.
    Instruction {
        /// Index of the instruction in the program.
        pc: usize,

        /// Byte offset of the instruction in the program text.
        position: usize,

        opcode: OpCode,
    },

    /// The program modified a register.
    RegisterWrite {
        file: RegisterFile,
        index: usize,

        /// The new value of the whole register.
        value: Vec4,
    },

    /// The program discarded the fragment.
    Kill {
        /// Index of the `KIL` instruction.
        pc: usize,
    },
}

/// Trait for consuming events.
pub trait EventListener {
    /// Called whenever a new event has been created.
    fn event(&mut self, event: &Event);
}

impl<F> EventListener for F where F: Fn(&Event) {
    fn event(&mut self, event: &Event) {
        self(event)
    }
}

pub(crate) struct EventDispatcher {
    listeners: Vec<Box<dyn EventListener>>,
}

impl EventDispatcher {
    pub fn new() -> EventDispatcher {
        EventDispatcher {
            listeners: Vec::new(),
        }
    }

    pub fn add_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener) as Box<dyn EventListener>)
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn dispatch(&mut self, event: Event) {
        for listener in &mut self.listeners {
            listener.event(&event);
        }
    }
}
