//! Size, alignment, offset queries and struct/union layout.

use crate::{Member, Type, TypeId, TypeTable};

fn align_up(x: u64, a: u64) -> u64 {
    debug_assert!(a.is_power_of_two());
    (x + a - 1) & !(a - 1)
}

impl TypeTable {
    /// Object size in bytes. None for incomplete, void, and function types.
    pub fn size_of(&self, id: TypeId) -> Option<u64> {
        match self.get(id) {
            Type::Void | Type::Function { .. } => None,
            Type::Arith { width, .. } => Some(match width {
                1 | 8 => 1,
                16 => 2,
                32 => 4,
                64 => 8,
                // x87 extended precision is stored padded to 16 bytes.
                80 => 16,
                _ => unreachable!("bad arithmetic width"),
            }),
            Type::Pointer { .. } => Some(8),
            Type::Array { elem, len } => {
                let n = (*len)?;
                Some(n * self.size_of(elem.id)?)
            }
            Type::Record(r) => r.complete.then_some(r.size),
        }
    }

    /// Natural alignment in bytes. None where size is undefined.
    pub fn align_of(&self, id: TypeId) -> Option<u64> {
        match self.get(id) {
            Type::Void | Type::Function { .. } => None,
            Type::Arith { width, .. } => Some(match width {
                1 | 8 => 1,
                16 => 2,
                32 => 4,
                64 => 8,
                80 => 16,
                _ => unreachable!("bad arithmetic width"),
            }),
            Type::Pointer { .. } => Some(8),
            Type::Array { elem, .. } => self.align_of(elem.id),
            Type::Record(r) => r.complete.then_some(r.align),
        }
    }

    /// Byte offset of a (possibly anonymous-nested) member.
    pub fn offset_of(&self, id: TypeId, name: &str) -> Option<u64> {
        self.member_ref(id, name).map(|m| m.offset)
    }

    /// Lay out struct members in declaration order, packing bit-fields into
    /// storage units. Returns (size, align) and fills each member's offset.
    ///
    /// Bit-field rules: consecutive bit-fields of the same declared type
    /// share a storage unit while they fit; a zero-width bit-field closes
    /// the current unit; an unnamed non-zero bit-field reserves bits.
    pub(crate) fn layout_struct(&self, members: &mut [Member], has_flexible: bool) -> (u64, u64) {
        let mut offset = 0u64;
        let mut max_align = 1u64;
        let mut unit_size = 0u64; // current bit-field storage unit, 0 = none open
        let mut unit_bits = 0u32; // bits consumed in the open unit

        let n = members.len();
        for (i, m) in members.iter_mut().enumerate() {
            if let Some(width) = m.bit_width {
                let storage = self.size_of(m.ty.id).expect("bit-field of incomplete type");
                let storage_bits = storage as u32 * 8;

                if width == 0 {
                    // Zero width closes the unit; the next member starts fresh.
                    if unit_size > 0 {
                        offset += unit_size;
                        unit_size = 0;
                        unit_bits = 0;
                    }
                    m.offset = offset;
                    m.bit_offset = None;
                    continue;
                }

                let new_unit =
                    unit_size == 0 || unit_size != storage || unit_bits + width > storage_bits;
                if new_unit {
                    if unit_size > 0 {
                        offset += unit_size;
                    }
                    let align = storage;
                    offset = align_up(offset, align);
                    max_align = max_align.max(align);
                    unit_size = storage;
                    unit_bits = 0;
                }

                m.offset = offset;
                m.bit_offset = Some(unit_bits);
                unit_bits += width;
            } else {
                if unit_size > 0 {
                    offset += unit_size;
                    unit_size = 0;
                    unit_bits = 0;
                }

                if has_flexible && i == n - 1 {
                    // The flexible array member contributes alignment only.
                    let elem = self.elem(m.ty.id).expect("flexible member is an array");
                    let align = self.align_of(elem.id).expect("flexible element incomplete");
                    max_align = max_align.max(align);
                    offset = align_up(offset, align);
                    m.offset = offset;
                    continue;
                }

                let natural = self.align_of(m.ty.id).expect("member of incomplete type");
                let align = m.explicit_align.map(u64::from).unwrap_or(natural).max(natural);
                max_align = max_align.max(align);
                offset = align_up(offset, align);
                m.offset = offset;
                offset += self.size_of(m.ty.id).expect("member of incomplete type");
            }
        }

        if unit_size > 0 {
            offset += unit_size;
        }

        (align_up(offset, max_align), max_align)
    }

    /// Union layout: every member at offset 0; size is the padded maximum.
    pub(crate) fn layout_union(&self, members: &mut [Member]) -> (u64, u64) {
        let mut size = 0u64;
        let mut max_align = 1u64;

        for m in members.iter_mut() {
            m.offset = 0;
            if m.bit_width == Some(0) {
                continue;
            }
            if m.is_bit_field() {
                m.bit_offset = Some(0);
            }
            let msize = self.size_of(m.ty.id).expect("member of incomplete type");
            let natural = self.align_of(m.ty.id).expect("member of incomplete type");
            let align = m.explicit_align.map(u64::from).unwrap_or(natural).max(natural);
            size = size.max(msize);
            max_align = max_align.max(align);
        }

        (align_up(size, max_align), max_align)
    }
}
