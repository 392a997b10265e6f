//! Marshalling of host-owned strings into a [`HostInvocation`]
//!
//! Hosts hand the bridge opaque handles (JNI strings and arrays on Android).
//! Everything is copied into owned Rust strings before the interpreter is
//! touched. Element handles taken out of an array are acquisitions and are
//! released through [`Acquired`], so each one is released exactly once no
//! matter where decoding stops.

use crate::entry::{EntrySpec, HostInvocation};
use crate::errors::BridgeError;
use droid_logger as logger;

/// Access to the host runtime's string and array handles
pub trait HostRuntime {
    type Text;
    type TextArray;

    /// Copy a host string into an owned Rust string
    fn read_text(&mut self, text: &Self::Text) -> Result<String, BridgeError>;

    fn array_len(&mut self, array: &Self::TextArray) -> Result<usize, BridgeError>;

    /// Obtain a new handle to an array element; it must be passed to `release`
    fn array_element(
        &mut self,
        array: &Self::TextArray,
        index: usize,
    ) -> Result<Self::Text, BridgeError>;

    fn release(&mut self, text: Self::Text);
}

/// The entry argument as the host passed it
pub enum HostEntry<'a, H: HostRuntime> {
    Single(&'a H::Text),
    Argv(&'a H::TextArray),
}

/// A handle owned by the bridge until dropped
pub struct Acquired<'h, H: HostRuntime> {
    host: &'h mut H,
    text: Option<H::Text>,
}

impl<'h, H: HostRuntime> Acquired<'h, H> {
    pub fn element(
        host: &'h mut H,
        array: &H::TextArray,
        index: usize,
    ) -> Result<Self, BridgeError> {
        let text = host.array_element(array, index)?;
        Ok(Self {
            host,
            text: Some(text),
        })
    }

    pub fn read(&mut self) -> Result<String, BridgeError> {
        match self.text {
            Some(ref text) => self.host.read_text(text),
            None => Err(BridgeError::ConfigurationDecode(
                "host string: handle already released".to_string(),
            )),
        }
    }
}

impl<H: HostRuntime> Drop for Acquired<'_, H> {
    fn drop(&mut self) {
        if let Some(text) = self.text.take() {
            self.host.release(text);
        }
    }
}

fn read_labeled<H: HostRuntime>(
    host: &mut H,
    text: &H::Text,
    label: &str,
) -> Result<String, BridgeError> {
    host.read_text(text).map_err(|e| relabel(e, label))
}

fn relabel(err: BridgeError, label: &str) -> BridgeError {
    match err {
        BridgeError::ConfigurationDecode(detail) => {
            BridgeError::ConfigurationDecode(format!("{} ({})", label, detail))
        }
        other => other,
    }
}

/// Decode the host's arguments into an owned invocation
pub fn decode_invocation<H: HostRuntime>(
    host: &mut H,
    home: &H::Text,
    search_path: &H::Text,
    entry: HostEntry<'_, H>,
) -> Result<HostInvocation, BridgeError> {
    let home = read_labeled(host, home, "interpreter home")?;
    let search_path = read_labeled(host, search_path, "module search path")?;

    let entry = match entry {
        HostEntry::Single(name) => EntrySpec::Single(read_labeled(host, name, "script name")?),
        HostEntry::Argv(array) => {
            let len = host.array_len(array)?;
            let mut args = Vec::with_capacity(len);
            for index in 0..len {
                let mut element = Acquired::element(host, array, index)?;
                let arg = element
                    .read()
                    .map_err(|e| relabel(e, &format!("argument {}", index)))?;
                args.push(arg);
            }
            logger::debug(&format!("Decoded {} host arguments", args.len()));
            EntrySpec::argv(args)?
        }
    };

    HostInvocation::new(home, search_path, entry)
}
