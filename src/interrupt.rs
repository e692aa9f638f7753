pub mod timer;

/// A maskable interrupt line.
///
/// While masked, the line does not deliver interrupts. A line may latch an
/// interrupt raised while masked and deliver it from [`Irq::unmask`].
pub trait Irq {
    fn mask(&self);
    fn unmask(&self);
    fn is_masked(&self) -> bool;
}

/// Keeps an interrupt line masked for as long as it lives.
///
/// Dropping the guard restores the line to the state it had when the guard
/// was created, so guards nest: only the outermost guard unmasks.
#[must_use = "the line is unmasked again as soon as the guard is dropped"]
pub struct IntrptGuard<'a> {
    irq: &'a dyn Irq,
    was_masked: bool,
}
impl<'a> IntrptGuard<'a> {
    pub fn new(irq: &'a dyn Irq) -> Self {
        let was_masked = irq.is_masked();
        if !was_masked {
            irq.mask();
        }
        Self { irq, was_masked }
    }

    /// Is this the guard that will unmask the line.
    pub fn is_outermost(&self) -> bool { !self.was_masked }
}

impl Drop for IntrptGuard<'_> {
    fn drop(&mut self) {
        if !self.was_masked {
            self.irq.unmask();
        }
    }
}
