//! [`HostRuntime`] over a JNI environment
//!
//! UTF chars pinned by `GetStringUTFChars` are released when `jni`'s
//! `JavaStr` drops, right after the copy. Array elements are fresh local
//! references and are deleted through `release`.

use droid_logger as logger;
use droid_python::{BridgeError, HostRuntime};
use jni::objects::{JObjectArray, JString};
use jni::sys::jsize;
use jni::JNIEnv;

pub struct JniHost<'a, 'local> {
    env: &'a mut JNIEnv<'local>,
}

impl<'a, 'local> JniHost<'a, 'local> {
    pub fn new(env: &'a mut JNIEnv<'local>) -> Self {
        Self { env }
    }

    fn decode_error(&mut self, what: &str, err: jni::errors::Error) -> BridgeError {
        // A failed JNI call may leave an exception pending; the bridge reports
        // through its own error instead of rethrowing into Java.
        if self.env.exception_check().unwrap_or(false) {
            let _ = self.env.exception_clear();
        }
        BridgeError::ConfigurationDecode(format!("{}: {}", what, err))
    }
}

impl<'local> HostRuntime for JniHost<'_, 'local> {
    type Text = JString<'local>;
    type TextArray = JObjectArray<'local>;

    fn read_text(&mut self, text: &Self::Text) -> Result<String, BridgeError> {
        if text.is_null() {
            return Err(BridgeError::ConfigurationDecode("null string".to_string()));
        }
        let chars = match self.env.get_string(text) {
            Ok(chars) => chars,
            Err(e) => return Err(self.decode_error("GetStringUTFChars failed", e)),
        };
        Ok(String::from(chars))
    }

    fn array_len(&mut self, array: &Self::TextArray) -> Result<usize, BridgeError> {
        if array.is_null() {
            return Err(BridgeError::ConfigurationDecode(
                "null argument array".to_string(),
            ));
        }
        let len = match self.env.get_array_length(array) {
            Ok(len) => len,
            Err(e) => return Err(self.decode_error("GetArrayLength failed", e)),
        };
        usize::try_from(len).map_err(|_| {
            BridgeError::ConfigurationDecode(format!("negative array length {}", len))
        })
    }

    fn array_element(
        &mut self,
        array: &Self::TextArray,
        index: usize,
    ) -> Result<Self::Text, BridgeError> {
        let index = jsize::try_from(index).map_err(|_| {
            BridgeError::ConfigurationDecode(format!("array index {} out of range", index))
        })?;
        match self.env.get_object_array_element(array, index) {
            Ok(element) => Ok(JString::from(element)),
            Err(e) => Err(self.decode_error("GetObjectArrayElement failed", e)),
        }
    }

    fn release(&mut self, text: Self::Text) {
        if let Err(e) = self.env.delete_local_ref(text) {
            logger::warn(&format!("Failed to delete local reference: {}", e));
        }
    }
}
