use rand::Rng;
use tracemark_types::TrackingCode;

/// Mints candidate tracking codes.
///
/// Generators know nothing about prior issuances. Uniqueness is enforced
/// by the ledger, and the service asks for a fresh code on collision.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> TrackingCode;
}

/// Uniformly random 32-bit codes from the thread-local CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> TrackingCode {
        let mut bytes = [0u8; 4];
        rand::thread_rng().fill(&mut bytes);
        TrackingCode::from_bytes(bytes)
    }
}

impl<F> CodeGenerator for F
where
    F: Fn() -> TrackingCode + Send + Sync,
{
    fn generate(&self) -> TrackingCode {
        self()
    }
}
