//! The AP netlist: the connectivity the placer actually sees.
//!
//! A block is a collection of atoms (one prepacked molecule) that move
//! together. Ports and pins mirror the atom-level connectivity, and nets are
//! hyperedges over pins. The netlist is built once by a collaborator and is
//! read-only for the whole placement flow; iteration order of every entity
//! kind matches insertion order.

use crate::ids::{BlockId, MoleculeId, NetId, PinId, PortId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether a block may be moved by the placer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockMobility {
    /// The block is not constrained in any dimension.
    Moveable,
    /// The block is fixed in at least one dimension.
    Fixed,
}

/// The location constraint of a fixed block.
///
/// `None` in a component means the block is unconstrained on that axis, so
/// "fixed in x only" is expressible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedBlockLoc {
    /// The fixed x coordinate, if constrained.
    pub x: Option<i32>,
    /// The fixed y coordinate, if constrained.
    pub y: Option<i32>,
    /// The fixed layer, if constrained.
    pub layer: Option<i32>,
    /// The fixed sub-tile, if constrained.
    pub sub_tile: Option<i32>,
}

/// The direction of a port on a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// An input port.
    Input,
    /// An output port.
    Output,
    /// A clock input port.
    Clock,
}

/// The role of a pin on its net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinKind {
    /// The pin drives the net.
    Driver,
    /// The pin is driven by the net.
    Sink,
}

/// A block in the AP netlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApBlock {
    /// The unique ID of this block.
    pub id: BlockId,
    /// Human-readable block name.
    pub name: String,
    /// The prepacked molecule this block represents.
    pub molecule: MoleculeId,
    /// Whether this block may be moved by the placer.
    pub mobility: BlockMobility,
    /// The location constraint; meaningful only for fixed blocks.
    pub fixed_loc: FixedBlockLoc,
    /// The ports belonging to this block, in creation order.
    pub ports: Vec<PortId>,
}

/// A port on a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApPort {
    /// The unique ID of this port.
    pub id: PortId,
    /// The port name.
    pub name: String,
    /// The block this port belongs to.
    pub block: BlockId,
    /// The width (number of bits) of the port.
    pub width: u32,
    /// The direction of the port.
    pub direction: PortDirection,
    /// The pins of this port, in creation order.
    pub pins: Vec<PinId>,
}

/// A pin: one bit of a port, attached to a net.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApPin {
    /// The unique ID of this pin.
    pub id: PinId,
    /// The port this pin belongs to.
    pub port: PortId,
    /// The bit index within the port.
    pub bit: u32,
    /// The net this pin is attached to.
    pub net: NetId,
    /// Whether this pin drives or sinks its net.
    pub kind: PinKind,
    /// Whether this pin carries a constant value (vcc/gnd).
    pub is_const: bool,
}

/// A net: a hyperedge over pins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApNet {
    /// The unique ID of this net.
    pub id: NetId,
    /// Human-readable net name.
    pub name: String,
    /// The pins attached to this net, in attachment order.
    pub pins: Vec<PinId>,
    /// Ignored nets are excluded from the wirelength objective and HPWL.
    pub is_ignored: bool,
    /// Global nets (clocks, resets) are excluded from the post-placement
    /// wirelength estimate.
    pub is_global: bool,
}

/// The netlist used during analytical placement.
///
/// Built once via the `create_*` mutators and frozen thereafter. All of the
/// `create_*` functions silently return the existing ID when given a name
/// that was already created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApNetlist {
    /// The name of the netlist (e.g. the top-level module).
    pub name: String,
    blocks: Vec<ApBlock>,
    ports: Vec<ApPort>,
    pins: Vec<ApPin>,
    nets: Vec<ApNet>,
    #[serde(skip)]
    block_by_name: HashMap<String, BlockId>,
    #[serde(skip)]
    net_by_name: HashMap<String, NetId>,
}

impl ApNetlist {
    /// Creates an empty netlist with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a block for the given molecule, or returns the existing block
    /// with this name. New blocks are moveable.
    pub fn create_block(&mut self, name: impl Into<String>, molecule: MoleculeId) -> BlockId {
        let name = name.into();
        if let Some(&id) = self.block_by_name.get(&name) {
            return id;
        }
        let id = BlockId::from_raw(self.blocks.len() as u32);
        self.block_by_name.insert(name.clone(), id);
        self.blocks.push(ApBlock {
            id,
            name,
            molecule,
            mobility: BlockMobility::Moveable,
            fixed_loc: FixedBlockLoc::default(),
            ports: Vec::new(),
        });
        id
    }

    /// Fixes a block at the given location and marks it as fixed.
    pub fn set_block_loc(&mut self, id: BlockId, loc: FixedBlockLoc) {
        let block = &mut self.blocks[id.index()];
        block.fixed_loc = loc;
        block.mobility = BlockMobility::Fixed;
    }

    /// Creates a port on the given block.
    pub fn create_port(
        &mut self,
        block: BlockId,
        name: impl Into<String>,
        width: u32,
        direction: PortDirection,
    ) -> PortId {
        let id = PortId::from_raw(self.ports.len() as u32);
        self.ports.push(ApPort {
            id,
            name: name.into(),
            block,
            width,
            direction,
            pins: Vec::new(),
        });
        self.blocks[block.index()].ports.push(id);
        id
    }

    /// Creates a pin at the given bit of a port, attached to the given net.
    pub fn create_pin(
        &mut self,
        port: PortId,
        bit: u32,
        net: NetId,
        kind: PinKind,
        is_const: bool,
    ) -> PinId {
        let id = PinId::from_raw(self.pins.len() as u32);
        self.pins.push(ApPin {
            id,
            port,
            bit,
            net,
            kind,
            is_const,
        });
        self.ports[port.index()].pins.push(id);
        self.nets[net.index()].pins.push(id);
        id
    }

    /// Creates an empty net, or returns the existing net with this name.
    pub fn create_net(&mut self, name: impl Into<String>) -> NetId {
        let name = name.into();
        if let Some(&id) = self.net_by_name.get(&name) {
            return id;
        }
        let id = NetId::from_raw(self.nets.len() as u32);
        self.net_by_name.insert(name.clone(), id);
        self.nets.push(ApNet {
            id,
            name,
            pins: Vec::new(),
            is_ignored: false,
            is_global: false,
        });
        id
    }

    /// Marks a net as ignored for the wirelength objective.
    pub fn set_net_ignored(&mut self, id: NetId, ignored: bool) {
        self.nets[id.index()].is_ignored = ignored;
    }

    /// Marks a net as global (clock/reset class).
    pub fn set_net_global(&mut self, id: NetId, global: bool) {
        self.nets[id.index()].is_global = global;
    }

    /// Returns an iterator over all block IDs in insertion order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len()).map(|i| BlockId::from_raw(i as u32))
    }

    /// Returns an iterator over all port IDs in insertion order.
    pub fn ports(&self) -> impl Iterator<Item = PortId> + '_ {
        (0..self.ports.len()).map(|i| PortId::from_raw(i as u32))
    }

    /// Returns an iterator over all pin IDs in insertion order.
    pub fn pins(&self) -> impl Iterator<Item = PinId> + '_ {
        (0..self.pins.len()).map(|i| PinId::from_raw(i as u32))
    }

    /// Returns an iterator over all net IDs in insertion order.
    pub fn nets(&self) -> impl Iterator<Item = NetId> + '_ {
        (0..self.nets.len()).map(|i| NetId::from_raw(i as u32))
    }

    /// Returns the block with the given ID.
    pub fn block(&self, id: BlockId) -> &ApBlock {
        &self.blocks[id.index()]
    }

    /// Returns the molecule the given block represents.
    pub fn block_molecule(&self, id: BlockId) -> MoleculeId {
        self.blocks[id.index()].molecule
    }

    /// Returns the mobility of the given block.
    pub fn block_mobility(&self, id: BlockId) -> BlockMobility {
        self.blocks[id.index()].mobility
    }

    /// Returns the location constraint of the given block.
    ///
    /// Meaningful only when the block is fixed.
    pub fn block_loc(&self, id: BlockId) -> &FixedBlockLoc {
        &self.blocks[id.index()].fixed_loc
    }

    /// Returns the port with the given ID.
    pub fn port(&self, id: PortId) -> &ApPort {
        &self.ports[id.index()]
    }

    /// Returns the pin with the given ID.
    pub fn pin(&self, id: PinId) -> &ApPin {
        &self.pins[id.index()]
    }

    /// Returns the block that owns the given pin.
    pub fn pin_block(&self, id: PinId) -> BlockId {
        let port = self.pins[id.index()].port;
        self.ports[port.index()].block
    }

    /// Returns the direction of the port the given pin belongs to.
    pub fn pin_direction(&self, id: PinId) -> PortDirection {
        let port = self.pins[id.index()].port;
        self.ports[port.index()].direction
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> &ApNet {
        &self.nets[id.index()]
    }

    /// Returns the pins of the given net.
    pub fn net_pins(&self, id: NetId) -> &[PinId] {
        &self.nets[id.index()].pins
    }

    /// Returns whether the given net is ignored for the objective.
    pub fn net_is_ignored(&self, id: NetId) -> bool {
        self.nets[id.index()].is_ignored
    }

    /// Returns whether the given net is global.
    pub fn net_is_global(&self, id: NetId) -> bool {
        self.nets[id.index()].is_global
    }

    /// Looks up a block by name.
    pub fn find_block(&self, name: &str) -> Option<BlockId> {
        self.block_by_name.get(name).copied()
    }

    /// Looks up a net by name.
    pub fn find_net(&self, name: &str) -> Option<NetId> {
        self.net_by_name.get(name).copied()
    }

    /// Returns the number of blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the number of ports.
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Returns the number of pins.
    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Returns the number of nets.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Rebuilds the name lookup maps after deserialization.
    pub fn rebuild_indices(&mut self) {
        self.block_by_name.clear();
        for (i, block) in self.blocks.iter().enumerate() {
            self.block_by_name
                .insert(block.name.clone(), BlockId::from_raw(i as u32));
        }
        self.net_by_name.clear();
        for (i, net) in self.nets.iter().enumerate() {
            self.net_by_name
                .insert(net.name.clone(), NetId::from_raw(i as u32));
        }
    }
}
