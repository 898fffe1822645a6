//! Frame buffer manager
//!
//! Single-frame writes go through the two on-the-fly slots: the corrected
//! frame lands in the shadow slot and the display pointer is latched to it
//! only after the DMA write completed, so the panel never scans a slot that
//! is being written.
//!
//! Sequences use the same idea one level up: a new sequence is written into
//! the inactive bank and becomes the active bank only after every frame is
//! on the board. A failed upload leaves the previous sequence untouched.

use slm_hal::{Bank, FrameRegion};

use crate::error::{Result, SlmError};
use crate::frame::Frame;
use crate::registry::{Board, BoardCore};

/// Front/shadow bookkeeping for the on-the-fly slots.
#[derive(Debug, Default)]
pub(crate) struct FrameSlots {
    front: Option<Bank>,
}

impl FrameSlots {
    /// Slot the next write goes to.
    pub(crate) fn shadow(&self) -> Bank {
        self.front.map_or(Bank::A, Bank::flip)
    }

    /// Slot presented most recently.
    pub(crate) fn front(&self) -> Option<Bank> {
        self.front
    }

    fn present(&mut self, bank: Bank) {
        self.front = Some(bank);
    }
}

/// Active sequence bank and its length.
#[derive(Debug, Default)]
pub(crate) struct SequenceBanks {
    active: Option<(Bank, usize)>,
}

impl SequenceBanks {
    /// Active bank and frame count.
    pub(crate) fn active(&self) -> Option<(Bank, usize)> {
        self.active
    }

    fn target(&self) -> Bank {
        self.active.map_or(Bank::A, |(bank, _)| bank.flip())
    }

    fn commit(&mut self, bank: Bank, len: usize) {
        self.active = Some((bank, len));
    }
}

impl Board {
    /// Correct `frame` and display it through the shadow slot.
    ///
    /// The caller has checked the size and that the board is not sequencing.
    pub(crate) fn stage(&self, core: &mut BoardCore, frame: &Frame) -> Result<()> {
        let drive = core.pipeline().render(frame.samples());
        let shadow = core.slots.shadow();
        let region = FrameRegion::Slot(shadow);
        core.transport
            .write_frame(region, &drive)
            .map_err(SlmError::fault(self.id))?;
        self.port.latch(region).map_err(SlmError::fault(self.id))?;
        core.slots.present(shadow);
        tracing::debug!(board = self.id.index(), %region, "frame staged");
        Ok(())
    }

    /// Correct and write `frames` into the inactive sequence bank, then make
    /// it the active bank.
    ///
    /// The caller has checked sizes, capacity and that the board is not
    /// sequencing.
    pub(crate) fn upload_sequence(&self, core: &mut BoardCore, frames: &[Frame]) -> Result<()> {
        let bank = core.sequence.target();
        self.park_display(core, bank)?;

        let pipeline = core.pipeline();
        for (index, frame) in frames.iter().enumerate() {
            let index = u32::try_from(index).map_err(|_| SlmError::SequenceTooLong {
                board: self.id,
                len: frames.len(),
                capacity: self.info.sequence_capacity,
            })?;
            let drive = pipeline.render(frame.samples());
            core.transport
                .write_frame(FrameRegion::sequence(bank, index), &drive)
                .map_err(SlmError::fault(self.id))?;
        }
        core.sequence.commit(bank, frames.len());
        tracing::debug!(
            board = self.id.index(),
            frames = frames.len(),
            bank = ?bank,
            "sequence uploaded"
        );
        Ok(())
    }

    /// If the panel is showing a frame from `bank`, copy that frame to the
    /// shadow slot and latch it, so `bank` can be overwritten.
    fn park_display(&self, core: &mut BoardCore, bank: Bank) -> Result<()> {
        let Some(region @ FrameRegion::Sequence { bank: shown, .. }) = self.port.latched() else {
            return Ok(());
        };
        if shown != bank {
            return Ok(());
        }
        let drive = core
            .transport
            .read_frame(region)
            .map_err(SlmError::fault(self.id))?;
        let shadow = core.slots.shadow();
        let parked = FrameRegion::Slot(shadow);
        core.transport
            .write_frame(parked, &drive)
            .map_err(SlmError::fault(self.id))?;
        self.port.latch(parked).map_err(SlmError::fault(self.id))?;
        core.slots.present(shadow);
        tracing::debug!(board = self.id.index(), from = %region, to = %parked, "display parked");
        Ok(())
    }

    /// Drive codes the panel is currently showing, `None` before the first latch.
    pub(crate) fn read_displayed(&self, core: &mut BoardCore) -> Result<Option<Frame>> {
        let Some(region) = self.port.latched() else {
            return Ok(None);
        };
        let samples = core
            .transport
            .read_frame(region)
            .map_err(SlmError::fault(self.id))?;
        let panel = self.info.panel;
        Frame::new(panel.width, panel.height, samples).map(Some)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn slots_alternate_after_each_present() {
        let mut slots = FrameSlots::default();
        assert_eq!(slots.front(), None);
        assert_eq!(slots.shadow(), Bank::A);
        slots.present(Bank::A);
        assert_eq!(slots.shadow(), Bank::B);
        slots.present(Bank::B);
        assert_eq!(slots.shadow(), Bank::A);
    }

    #[test]
    fn sequence_target_is_the_inactive_bank() {
        let mut banks = SequenceBanks::default();
        assert_eq!(banks.target(), Bank::A);
        banks.commit(Bank::A, 3);
        assert_eq!(banks.active(), Some((Bank::A, 3)));
        assert_eq!(banks.target(), Bank::B);
    }
}
