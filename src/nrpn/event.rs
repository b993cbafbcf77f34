//! `NrpnEvent`: a composite NRPN parameter node, built depth-first and flattened into
//! atomic MIDI CC events by [`NrpnEvent::expand`]. Grounded directly on
//! `original_source/NrpnEvent.cpp`'s `expand`/`convert`/`compareTo`.

use crate::model::tick::Tick;
use std::cmp::Reverse;

/// One CC 0x63 (NRPN MSB select) / 0x62 (NRPN LSB select) / 0x06 (data entry) / 0x26
/// (data entry LSB) controller event, in final stream order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerEvent {
    pub tick: Tick,
    pub controller: u8,
    pub value: u8,
}

/// A composite NRPN write: an address, a one- or two-byte data value, and a list of
/// follow-up writes at the same tick. Follow-ups flagged `omit_msb` share the parent's
/// NRPN MSB and skip re-emitting CC 0x63.
#[derive(Clone, Debug)]
pub struct NrpnEvent {
    tick: Tick,
    nrpn_msb: u8,
    nrpn_lsb: u8,
    data_msb: u8,
    data_lsb: Option<u8>,
    follow_ups: Vec<(NrpnEvent, bool)>,
}

impl NrpnEvent {
    /// A one-byte data write.
    pub fn new(tick: Tick, nrpn_msb: u8, nrpn_lsb: u8, data_msb: u8) -> Self {
        Self {
            tick,
            nrpn_msb,
            nrpn_lsb,
            data_msb,
            data_lsb: None,
            follow_ups: Vec::new(),
        }
    }

    /// A two-byte (MSB + LSB) data write.
    pub fn with_lsb(tick: Tick, nrpn_msb: u8, nrpn_lsb: u8, data_msb: u8, data_lsb: u8) -> Self {
        Self {
            tick,
            nrpn_msb,
            nrpn_lsb,
            data_msb,
            data_lsb: Some(data_lsb),
            follow_ups: Vec::new(),
        }
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn nrpn_msb(&self) -> u8 {
        self.nrpn_msb
    }

    /// Appends a follow-up write at the same tick. `omit_msb` should be true whenever
    /// `event.nrpn_msb` equals the MSB most recently emitted in the stream, letting
    /// `expand` skip a redundant CC 0x63.
    pub fn append(&mut self, event: NrpnEvent, omit_msb: bool) {
        self.follow_ups.push((event, omit_msb));
    }

    /// Flattens this composite, and its follow-ups depth-first, into atomic controller
    /// events. The root's NRPN MSB select is always emitted.
    pub fn expand(&self) -> Vec<ControllerEvent> {
        let mut out = Vec::new();
        self.convert(&mut out, false);
        out
    }

    fn convert(&self, out: &mut Vec<ControllerEvent>, omit_msb: bool) {
        if !omit_msb {
            out.push(ControllerEvent {
                tick: self.tick,
                controller: 0x63,
                value: self.nrpn_msb,
            });
        }
        out.push(ControllerEvent {
            tick: self.tick,
            controller: 0x62,
            value: self.nrpn_lsb,
        });
        out.push(ControllerEvent {
            tick: self.tick,
            controller: 0x06,
            value: self.data_msb,
        });
        if let Some(lsb) = self.data_lsb {
            out.push(ControllerEvent {
                tick: self.tick,
                controller: 0x26,
                value: lsb,
            });
        }
        for (child, child_omit) in &self.follow_ups {
            child.convert(out, *child_omit);
        }
    }
}

/// Sort key for ordering composites before flattening: ascending tick, then descending
/// NRPN MSB (`original_source/NrpnEvent.cpp`'s `compareTo`/`compare`).
pub fn sort_key(event: &NrpnEvent) -> (Tick, Reverse<u8>) {
    (event.tick, Reverse(event.nrpn_msb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_emits_full_quadruple_for_a_lone_event() {
        let event = NrpnEvent::with_lsb(10, 0x63, 0x01, 0x02, 0x03);
        let atoms = event.expand();
        assert_eq!(4, atoms.len());
        assert_eq!(0x63, atoms[0].controller);
        assert_eq!(0x63, atoms[0].value);
        assert_eq!(0x62, atoms[1].controller);
        assert_eq!(0x06, atoms[2].controller);
        assert_eq!(0x26, atoms[3].controller);
    }

    #[test]
    fn follow_up_with_omit_msb_skips_cc_0x63() {
        let mut root = NrpnEvent::new(10, 0x50, 0x01, 0x00);
        root.append(NrpnEvent::new(10, 0x50, 0x02, 0x40), true);
        let atoms = root.expand();
        // root: 0x63,0x62,0x06 ; follow-up: 0x62,0x06 (no 0x63)
        assert_eq!(5, atoms.len());
        assert_eq!(0x63, atoms[0].controller);
        assert_eq!(0x62, atoms[3].controller);
        assert_eq!(0x06, atoms[4].controller);
    }

    #[test]
    fn follow_up_without_omit_msb_re_emits_cc_0x63() {
        let mut root = NrpnEvent::new(10, 0x50, 0x01, 0x00);
        root.append(NrpnEvent::new(10, 0x60, 0x02, 0x40), false);
        let atoms = root.expand();
        assert_eq!(6, atoms.len());
        assert_eq!(0x63, atoms[0].controller);
        assert_eq!(0x63, atoms[3].controller);
        assert_eq!(0x60, atoms[3].value);
    }

    #[test]
    fn sort_key_orders_by_tick_then_descending_msb() {
        let a = NrpnEvent::new(10, 0x50, 0, 0);
        let b = NrpnEvent::new(10, 0x60, 0, 0);
        let c = NrpnEvent::new(5, 0x70, 0, 0);
        let mut events = vec![a, b, c];
        events.sort_by_key(sort_key);
        assert_eq!(5, events[0].tick());
        assert_eq!(0x60, events[1].nrpn_msb());
        assert_eq!(0x50, events[2].nrpn_msb());
    }
}
