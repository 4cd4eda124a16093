use crate::memory::HostMemory;

/// The sandbox boundary: one text envelope in, one text envelope out.
///
/// Values too wide for text travel through `memory`, which the host owns and
/// lends to the sandbox for the duration of the call. Implementations must
/// answer every envelope, including ones they cannot decode.
pub trait Sandbox {
    /// Executes one call envelope and returns the result envelope.
    fn invoke(&mut self, envelope: &str, memory: &mut HostMemory) -> String;
}

impl<S: Sandbox + ?Sized> Sandbox for Box<S> {
    fn invoke(&mut self, envelope: &str, memory: &mut HostMemory) -> String {
        (**self).invoke(envelope, memory)
    }
}
