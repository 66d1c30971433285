//! USB Power Delivery sink stack interface.
//!
//! The PD stack is an external collaborator. The adapter only needs to
//! connect once, read the advertised source capabilities, and then keep
//! requesting a programmable (PPS) voltage.
//!
//! Source capability objects are addressed by 1-based object position, as
//! on the wire. Fixed supplies come first, programmable supplies follow, so
//! PPS objects occupy positions `fixed_source_count() + 1 ..= total_source_count()`.

/// Power Delivery sink trait.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use pd_adapter::traits::PowerDelivery;
///
/// struct Ch32Pd { /* USB PD peripheral */ }
///
/// impl PowerDelivery for Ch32Pd {
///     fn connect(&mut self) -> bool { /* wait for Source_Capabilities */ true }
///     fn fixed_source_count(&self) -> u8 { 4 }
///     fn total_source_count(&self) -> u8 { 6 }
///     fn programmable_source_count(&self) -> u8 { 2 }
///     fn min_voltage_mv(&self, position: u8) -> u16 { 3300 }
///     fn max_voltage_mv(&self, position: u8) -> u16 { 11000 }
///     fn request_voltage(&mut self, mv: u16) { /* send Request */ }
///     fn renegotiate(&mut self) { /* re-run contract */ }
/// }
/// ```
pub trait PowerDelivery {
    /// Attach to the source and wait for its capabilities.
    ///
    /// Returns `false` if no PD source answered.
    fn connect(&mut self) -> bool;

    /// Number of fixed-voltage source objects.
    fn fixed_source_count(&self) -> u8;

    /// Total number of source objects (fixed and programmable).
    fn total_source_count(&self) -> u8;

    /// Number of programmable (PPS) source objects.
    fn programmable_source_count(&self) -> u8;

    /// Minimum voltage of the object at `position` (1-based), in millivolts.
    fn min_voltage_mv(&self, position: u8) -> u16;

    /// Maximum voltage of the object at `position` (1-based), in millivolts.
    fn max_voltage_mv(&self, position: u8) -> u16;

    /// Ask the source for `mv` millivolts on the programmable contract.
    fn request_voltage(&mut self, mv: u16);

    /// Re-run the PD contract negotiation.
    fn renegotiate(&mut self);

    /// Positions of the programmable objects.
    fn programmable_positions(&self) -> core::ops::RangeInclusive<u8> {
        self.fixed_source_count().saturating_add(1)..=self.total_source_count()
    }
}
