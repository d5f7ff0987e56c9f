//! Routing [`PoseEvent`]s to named callbacks.

use std::collections::HashMap;

use crate::error::ConfigError;

use super::{PoseActionRule, PoseEvent};

type Handler<S> = Box<dyn FnMut(&mut S, &PoseEvent)>;

/// Calls the handler registered under an event's callback name.
///
/// Handlers receive a mutable reference to a caller-owned session state `S`, which is where any
/// state shared between callbacks (eg. a menu selection, or whether the system is awake) lives.
pub struct Dispatcher<S> {
    handlers: HashMap<String, Handler<S>>,
    fallback: Option<Handler<S>>,
}

impl<S> Default for Dispatcher<S> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: None,
        }
    }
}

impl<S> Dispatcher<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under the callback name `name`, replacing any previous handler.
    pub fn register<N, F>(&mut self, name: N, handler: F) -> &mut Self
    where
        N: Into<String>,
        F: FnMut(&mut S, &PoseEvent) + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
        self
    }

    /// Sets a handler for events whose callback has no registered handler.
    pub fn set_fallback<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&mut S, &PoseEvent) + 'static,
    {
        self.fallback = Some(Box::new(handler));
        self
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Checks that every rule's callback can be dispatched.
    pub fn check_rules(&self, rules: &[PoseActionRule]) -> Result<(), ConfigError> {
        if self.fallback.is_some() {
            return Ok(());
        }
        for rule in rules {
            if let Some(callback) = rule.callback() {
                if !self.has_handler(callback) {
                    return Err(ConfigError::UnknownCallback {
                        rule: rule.name().to_string(),
                        callback: callback.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Passes `event` to its handler. Returns whether a handler was called.
    ///
    /// Events of rules without a callback are not dispatched.
    pub fn dispatch(&mut self, state: &mut S, event: &PoseEvent) -> bool {
        let Some(callback) = &event.callback else {
            return false;
        };

        match self.handlers.get_mut(callback.as_str()) {
            Some(handler) => handler(state, event),
            None => match &mut self.fallback {
                Some(fallback) => fallback(state, event),
                None => {
                    log::warn!("no handler for callback `{}` of rule `{}`", callback, event.rule);
                    return false;
                }
            },
        }
        true
    }

    /// Dispatches `events` in order. Returns the number of handlers called.
    pub fn dispatch_all<'a, I>(&mut self, state: &mut S, events: I) -> usize
    where
        I: IntoIterator<Item = &'a PoseEvent>,
    {
        events
            .into_iter()
            .filter(|event| self.dispatch(state, event))
            .count()
    }
}
