const DELETED: u8 = 1 << 0;

/// Status flags of a mesh element.
///
/// Deleted elements are kept in storage as tombstones until the mesh is
/// garbage collected.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Status {
    flags: u8,
}

impl Status {
    fn check(&self, i: u8) -> bool {
        self.flags & i > 0
    }

    fn set(&mut self, i: u8, flag: bool) {
        if flag {
            self.flags |= i;
        } else {
            self.flags &= !i;
        }
    }

    pub fn deleted(&self) -> bool {
        self.check(DELETED)
    }

    pub fn set_deleted(&mut self, flag: bool) {
        self.set(DELETED, flag);
    }
}
