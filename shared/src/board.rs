use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::Rng;
use tracing::{debug, warn};

use crate::boundary::Placement;
use crate::cell::{Cell, KingdomSlot, PlayerId};
use crate::discovery::discover;
use crate::error::BoardError;
use crate::grid::{CellPos, HexGrid, RectGrid};
use crate::kingdom::{Kingdom, KingdomId, RenderState};
use crate::render::{DrawHandle, Outline, OutlineStyle, Surface};

/// Cell ownership plus every materialised kingdom.
///
/// Cached membership lives in a side table keyed by position rather than on
/// the cells themselves, so a kingdom can be dropped without leaving dangling
/// references behind: clearing its entries is enough.
#[derive(Debug, Clone)]
pub struct Board<G: HexGrid = RectGrid> {
    grid: G,
    owners: HashMap<CellPos, PlayerId>,
    slots: HashMap<CellPos, KingdomSlot>,
    kingdoms: BTreeMap<KingdomId, Kingdom>,
    next_kingdom: u32,
    /// Render handles of kingdoms dropped while still drawn.
    retired: Vec<DrawHandle>,
    /// Kingdoms whose membership changed since they were last drawn.
    dirty: BTreeSet<KingdomId>,
}

impl<G: HexGrid> Board<G> {
    pub fn new(grid: G, mut owner_of: impl FnMut(CellPos) -> PlayerId) -> Self {
        let owners = grid
            .positions()
            .into_iter()
            .map(|pos| (pos, owner_of(pos)))
            .collect();
        Self {
            grid,
            owners,
            slots: HashMap::new(),
            kingdoms: BTreeMap::new(),
            next_kingdom: 0,
            retired: Vec::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Every cell gets a uniformly random owner among `players`.
    pub fn random<R: Rng + ?Sized>(grid: G, players: u8, rng: &mut R) -> Self {
        let players = players.max(1);
        Self::new(grid, |_| PlayerId(rng.gen_range(0..players)))
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn owner(&self, pos: CellPos) -> Option<PlayerId> {
        self.owners.get(&pos).copied()
    }

    /// Cached membership; `None` means not computed yet.
    pub fn slot(&self, pos: CellPos) -> Option<KingdomSlot> {
        self.slots.get(&pos).copied()
    }

    pub fn kingdom(&self, id: KingdomId) -> Option<&Kingdom> {
        self.kingdoms.get(&id)
    }

    pub fn kingdoms(&self) -> impl Iterator<Item = &Kingdom> {
        self.kingdoms.values()
    }

    /// All cells in grid order.
    pub fn cells(&self) -> Vec<Cell> {
        self.grid
            .positions()
            .into_iter()
            .filter_map(|pos| self.owner(pos).map(|owner| Cell { pos, owner }))
            .collect()
    }

    fn owner_in_bounds(&self, pos: CellPos) -> Result<PlayerId, BoardError> {
        if !self.grid.contains(pos) {
            return Err(BoardError::OutOfBounds(pos));
        }
        self.owner(pos).ok_or(BoardError::OutOfBounds(pos))
    }

    /// The kingdom `pos` belongs to, discovering it on first access.
    pub fn kingdom_of(&mut self, pos: CellPos) -> Result<Option<KingdomId>, BoardError> {
        self.owner_in_bounds(pos)?;
        match self.slot(pos) {
            Some(slot) => Ok(slot.kingdom()),
            None => self.kingdom_for(pos),
        }
    }

    /// Discovers the component around `pos` and materialises it as a kingdom.
    ///
    /// A lone cell is marked [`KingdomSlot::Isolated`] and yields `None`. Older
    /// kingdoms still cached on any cell of the component are dissolved first.
    pub fn kingdom_for(&mut self, pos: CellPos) -> Result<Option<KingdomId>, BoardError> {
        let owner = self.owner_in_bounds(pos)?;
        let component = discover(&self.grid, |p| self.owners.get(&p).copied(), pos);

        if component.len() < 2 {
            self.detach(pos)?;
            self.slots.insert(pos, KingdomSlot::Isolated);
            debug!(%pos, %owner, "cell has no kingdom");
            return Ok(None);
        }

        let stale: BTreeSet<KingdomId> = component
            .iter()
            .filter_map(|p| self.slot(*p).and_then(KingdomSlot::kingdom))
            .collect();
        for id in stale {
            self.retire(id);
        }

        let id = KingdomId(self.next_kingdom);
        self.next_kingdom += 1;
        let kingdom = Kingdom::new(id, owner, component, &self.grid)?;
        for cell in kingdom.cells() {
            self.slots.insert(*cell, KingdomSlot::Member(id));
        }
        debug!(%id, %owner, size = kingdom.len(), "materialised kingdom");
        self.kingdoms.insert(id, kingdom);
        Ok(Some(id))
    }

    /// Adds `pos` to kingdom `id`, taking it out of any other kingdom first.
    ///
    /// The cell must already have the kingdom's owner. Adjacent same-owner
    /// kingdoms are not merged. Drawn kingdoms touched by the move are redrawn.
    pub fn add_cell<S: Surface + ?Sized>(
        &mut self,
        id: KingdomId,
        pos: CellPos,
        surface: &mut S,
    ) -> Result<(), BoardError> {
        let owner = self.owner_in_bounds(pos)?;
        let kingdom = self.kingdoms.get(&id).ok_or(BoardError::UnknownKingdom(id))?;
        if kingdom.contains(pos) {
            return Ok(());
        }
        if kingdom.owner() != owner {
            return Err(BoardError::OwnerMismatch {
                kingdom: id,
                cell: pos,
                expected: kingdom.owner(),
                found: owner,
            });
        }

        self.detach(pos)?;
        let kingdom = self
            .kingdoms
            .get_mut(&id)
            .ok_or(BoardError::UnknownKingdom(id))?;
        kingdom.push_cell(pos, &self.grid)?;
        self.slots.insert(pos, KingdomSlot::Member(id));
        debug!(%id, %pos, size = kingdom.len(), "cell added to kingdom");
        self.dirty.insert(id);
        self.sync_drawings(surface)
    }

    /// Removes `pos` from kingdom `id`; the cell is left without a kingdom.
    ///
    /// Splits are not detected. A kingdom may shrink to one cell but not to zero.
    pub fn remove_cell<S: Surface + ?Sized>(
        &mut self,
        id: KingdomId,
        pos: CellPos,
        surface: &mut S,
    ) -> Result<(), BoardError> {
        self.owner_in_bounds(pos)?;
        let kingdom = self
            .kingdoms
            .get_mut(&id)
            .ok_or(BoardError::UnknownKingdom(id))?;
        kingdom.drop_cell(pos, &self.grid)?;
        if kingdom.len() == 1 {
            warn!(%id, "kingdom reduced to a single cell");
        }
        self.slots.insert(pos, KingdomSlot::Isolated);
        debug!(%id, %pos, "cell removed from kingdom");
        self.dirty.insert(id);
        self.sync_drawings(surface)
    }

    /// Changes the owner of `pos`, returning the previous one.
    ///
    /// A member cell leaves its kingdom and its cached membership is cleared;
    /// that kingdom is redrawn if it is drawn.
    pub fn set_owner<S: Surface + ?Sized>(
        &mut self,
        pos: CellPos,
        player: PlayerId,
        surface: &mut S,
    ) -> Result<PlayerId, BoardError> {
        let previous = self.owner_in_bounds(pos)?;
        if previous == player {
            return Ok(previous);
        }
        self.detach(pos)?;
        self.owners.insert(pos, player);
        self.sync_drawings(surface)?;
        Ok(previous)
    }

    /// Registers kingdom `id`'s outline with `surface`, placed against `anchor`.
    ///
    /// Any registration the kingdom already holds is released first.
    pub fn render<S: Surface + ?Sized>(
        &mut self,
        id: KingdomId,
        anchor: CellPos,
        surface: &mut S,
    ) -> Result<DrawHandle, BoardError> {
        self.owner_in_bounds(anchor)?;
        let kingdom = self.kingdoms.get(&id).ok_or(BoardError::UnknownKingdom(id))?;

        let anchor_center = self.grid.center_of(anchor);
        let corners = kingdom.member_corners(&self.grid);
        let placement = Placement::compute(&corners, kingdom.boundary(), anchor_center)?;
        let outline = Outline {
            kingdom: id,
            owner: kingdom.owner(),
            contours: kingdom.boundary().contours().to_vec(),
            position: anchor_center + placement.offset(),
            style: OutlineStyle::default(),
        };

        let kingdom = self
            .kingdoms
            .get_mut(&id)
            .ok_or(BoardError::UnknownKingdom(id))?;
        if let Some(previous) = kingdom.rendering.take() {
            surface.release(previous.handle);
        }
        let handle = surface.register_drawable(outline);
        kingdom.rendering = Some(RenderState { handle, anchor });
        self.dirty.remove(&id);
        debug!(%id, %anchor, handle = handle.0, "kingdom outline registered");
        Ok(handle)
    }

    /// Re-registers kingdom `id` at its current anchor if it is being drawn.
    pub fn refresh<S: Surface + ?Sized>(
        &mut self,
        id: KingdomId,
        surface: &mut S,
    ) -> Result<Option<DrawHandle>, BoardError> {
        let kingdom = self.kingdoms.get(&id).ok_or(BoardError::UnknownKingdom(id))?;
        match kingdom.anchor() {
            Some(anchor) => self.render(id, anchor, surface).map(Some),
            None => Ok(None),
        }
    }

    /// Releases kingdom `id`'s drawing registration. Returns whether one was active.
    ///
    /// Cached memberships are left alone.
    pub fn destroy<S: Surface + ?Sized>(
        &mut self,
        id: KingdomId,
        surface: &mut S,
    ) -> Result<bool, BoardError> {
        let kingdom = self
            .kingdoms
            .get_mut(&id)
            .ok_or(BoardError::UnknownKingdom(id))?;
        let Some(rendering) = kingdom.rendering.take() else {
            return Ok(false);
        };
        surface.release(rendering.handle);
        debug!(%id, handle = rendering.handle.0, "kingdom outline released");
        Ok(true)
    }

    /// Destroys kingdom `id` and forgets it, so its cells are rediscovered on next access.
    pub fn dissolve<S: Surface + ?Sized>(
        &mut self,
        id: KingdomId,
        surface: &mut S,
    ) -> Result<(), BoardError> {
        self.destroy(id, surface)?;
        self.retire(id);
        Ok(())
    }

    /// Brings the surface in line with the board: kingdoms whose membership
    /// changed are redrawn at their anchor and dropped kingdoms are released.
    pub fn sync_drawings<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<(), BoardError> {
        for id in std::mem::take(&mut self.dirty) {
            if self.kingdoms.contains_key(&id) {
                self.refresh(id, surface)?;
            }
        }
        self.release_retired(surface);
        Ok(())
    }

    /// Releases handles of kingdoms that were dropped while drawn.
    pub fn release_retired<S: Surface + ?Sized>(&mut self, surface: &mut S) -> usize {
        let retired = std::mem::take(&mut self.retired);
        for handle in &retired {
            surface.release(*handle);
        }
        retired.len()
    }

    fn retire(&mut self, id: KingdomId) {
        self.dirty.remove(&id);
        let Some(kingdom) = self.kingdoms.remove(&id) else {
            return;
        };
        for cell in kingdom.cells() {
            if self.slot(*cell) == Some(KingdomSlot::Member(id)) {
                self.slots.remove(cell);
            }
        }
        if let Some(rendering) = kingdom.rendering {
            self.retired.push(rendering.handle);
        }
        debug!(%id, "kingdom dissolved");
    }

    /// Takes `pos` out of whatever kingdom it is cached in and clears its slot.
    fn detach(&mut self, pos: CellPos) -> Result<(), BoardError> {
        if let Some(KingdomSlot::Member(id)) = self.slot(pos) {
            match self.kingdoms.get_mut(&id) {
                Some(kingdom) if kingdom.len() > 1 => {
                    kingdom.drop_cell(pos, &self.grid)?;
                    self.dirty.insert(id);
                }
                Some(_) => self.retire(id),
                None => {}
            }
        }
        self.slots.remove(&pos);
        Ok(())
    }
}
