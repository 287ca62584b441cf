//! Serialization bridge
//!
//! Save states go straight to the core on every call. The bridge adds the
//! quirks the core reported so rewind and autosave can tell whether sizes
//! are stable and whether a state may outlive the session.

use crate::core_handle::CoreHandle;
use rh_ffi::{CoreBinding, SerializationQuirks};
use tracing::{debug, warn};

pub struct SerializationBridge<'a, B: CoreBinding> {
    core: &'a mut CoreHandle<B>,
}

impl<B: CoreBinding> CoreHandle<B> {
    pub fn serialization(&mut self) -> SerializationBridge<'_, B> {
        SerializationBridge { core: self }
    }
}

impl<'a, B: CoreBinding> SerializationBridge<'a, B> {
    pub fn quirks(&self) -> SerializationQuirks {
        self.core.quirks()
    }

    /// Zero means save states are unsupported
    pub fn size(&mut self) -> usize {
        self.core.serialize_size()
    }

    pub fn is_supported(&mut self) -> bool {
        self.size() > 0
    }

    pub fn serialize(&mut self, buf: &mut [u8]) -> bool {
        self.core.serialize(buf)
    }

    pub fn unserialize(&mut self, buf: &[u8]) -> bool {
        self.core.unserialize(buf)
    }

    /// Capture a state sized by the core's current report
    pub fn save(&mut self) -> Option<Vec<u8>> {
        let size = self.size();
        if size == 0 {
            debug!("Core does not support save states");
            return None;
        }

        let mut state = vec![0u8; size];
        if !self.serialize(&mut state) {
            warn!("Core failed to serialize {} bytes", size);
            return None;
        }
        Some(state)
    }

    pub fn load(&mut self, state: &[u8]) -> bool {
        let ok = self.unserialize(state);
        if !ok {
            warn!("Core rejected a {} byte state", state.len());
        }
        ok
    }

    /// The serialized size does not change between calls
    pub fn size_is_stable(&self) -> bool {
        !self.quirks().contains(SerializationQuirks::CORE_VARIABLE_SIZE)
    }

    /// States are only valid within the session that produced them
    pub fn single_session(&self) -> bool {
        self.quirks().contains(SerializationQuirks::SINGLE_SESSION)
    }

    pub fn is_incomplete(&self) -> bool {
        self.quirks().contains(SerializationQuirks::INCOMPLETE)
    }

    /// The core must run a frame before states can be taken
    pub fn must_initialize(&self) -> bool {
        self.quirks().contains(SerializationQuirks::MUST_INITIALIZE)
    }

    /// States cannot move between machines
    pub fn is_portable(&self) -> bool {
        !self.quirks().intersects(
            SerializationQuirks::ENDIAN_DEPENDENT | SerializationQuirks::PLATFORM_DEPENDENT,
        )
    }
}
