//! Generic traversal of a path-element sequence through a layout tree.
//!
//! The walk itself is shared; consumers implement the callbacks to
//! decide what a finished, aborted, or failed traversal produces. Open
//! sequence elements contribute a `long` coordinate, everything else
//! only narrows the current layout.

use crate::lattice::PartialOrder;
use crate::types::{
    GroupVariant, LayoutName, MemoryLayoutType, PathElementType, SequenceVariant, Type,
};

pub trait PathWalk {
    type Out;

    /// Result when the walk runs off a `Bottom`/`Top` layout; `at` is
    /// the index of the next unconsumed path element.
    fn on_bottom_layout(&mut self, at: usize, coords: &mut Vec<Type>) -> Self::Out;
    fn on_top_layout(&mut self, at: usize, coords: &mut Vec<Type>) -> Self::Out;

    /// Result when every path element was consumed.
    fn on_path_empty(&mut self, layout: &MemoryLayoutType, coords: &mut Vec<Type>) -> Self::Out;

    fn on_top_path_element(
        &mut self,
        at: usize,
        layout: &MemoryLayoutType,
        coords: &mut Vec<Type>,
    ) -> Self::Out;
    fn on_bottom_path_element(
        &mut self,
        at: usize,
        layout: &MemoryLayoutType,
        coords: &mut Vec<Type>,
    ) -> Self::Out;

    /// The element kind cannot apply to the current layout kind. The
    /// returned layout continues the walk (usually `Top`).
    fn on_mismatch(
        &mut self,
        at: usize,
        element: &PathElementType,
        layout: &MemoryLayoutType,
    ) -> MemoryLayoutType;

    fn on_invalid_dereference(&mut self, at: usize) -> MemoryLayoutType;

    fn on_group_index_out_of_bounds(
        &mut self,
        at: usize,
        index: i64,
        members_size: Option<usize>,
    ) -> MemoryLayoutType;

    fn on_group_name_not_found(&mut self, at: usize, name: &str) -> MemoryLayoutType;

    fn on_sequence_index_out_of_bounds(
        &mut self,
        at: usize,
        index: i64,
        count: u64,
    ) -> MemoryLayoutType;

    fn walk(&mut self, path: &[PathElementType], layout: &MemoryLayoutType) -> Self::Out {
        let mut coords = Vec::new();
        let mut layout = layout.clone();
        let mut at = 0;
        loop {
            match layout {
                MemoryLayoutType::Bot => return self.on_bottom_layout(at, &mut coords),
                MemoryLayoutType::Top => return self.on_top_layout(at, &mut coords),
                _ => {}
            }
            let Some(element) = path.get(at) else {
                return self.on_path_empty(&layout, &mut coords);
            };
            layout = match element {
                PathElementType::Bot => {
                    return self.on_bottom_path_element(at, &layout, &mut coords)
                }
                PathElementType::Top => {
                    return self.on_top_path_element(at, &layout, &mut coords)
                }
                PathElementType::Sequence(variant) => {
                    self.sequence_step(at, element, *variant, &layout, &mut coords)
                }
                PathElementType::Group(variant) => {
                    self.group_step(at, element, variant, &layout)
                }
                PathElementType::Dereference => self.dereference_step(at, element, &layout),
            };
            at += 1;
        }
    }

    fn sequence_step(
        &mut self,
        at: usize,
        element: &PathElementType,
        variant: SequenceVariant,
        layout: &MemoryLayoutType,
        coords: &mut Vec<Type>,
    ) -> MemoryLayoutType {
        let sequence = match layout {
            MemoryLayoutType::Sequence(sequence) => sequence,
            _ => return self.on_mismatch(at, element, layout),
        };
        match variant {
            SequenceVariant::Open | SequenceVariant::SelectingOpen { .. } => {
                coords.push(Type::LONG);
            }
            SequenceVariant::Selecting { index: Some(index) } => {
                let count = sequence.element_count.unwrap_or(u64::MAX);
                if index < 0 || index as u64 >= count {
                    return self.on_sequence_index_out_of_bounds(at, index, count);
                }
            }
            SequenceVariant::Selecting { index: None } => {}
        }
        (*sequence.element).clone()
    }

    fn group_step(
        &mut self,
        at: usize,
        element: &PathElementType,
        variant: &GroupVariant,
        layout: &MemoryLayoutType,
    ) -> MemoryLayoutType {
        let members = match layout {
            MemoryLayoutType::Struct(group) | MemoryLayoutType::Union(group) => &group.members,
            _ => return self.on_mismatch(at, element, layout),
        };
        match variant {
            GroupVariant::Index(index) => {
                let Some(index) = *index else {
                    return MemoryLayoutType::Top;
                };
                if index >= i32::MAX as i64 {
                    return MemoryLayoutType::Top;
                }
                if index < 0 {
                    return self.on_group_index_out_of_bounds(at, index, members.size());
                }
                if members.compare_size(index as usize + 1) == PartialOrder::Lt {
                    return self.on_group_index_out_of_bounds(at, index, members.size());
                }
                members.get(index as usize)
            }
            GroupVariant::Name(name) => {
                let Some(name) = name else {
                    return MemoryLayoutType::Top;
                };
                // Multiple members may carry the same name, so any
                // member with an unknown name aborts the lookup.
                for member in members.known_elements() {
                    match member.name() {
                        LayoutName::Exact(Some(member_name)) if member_name == *name => {
                            return member;
                        }
                        LayoutName::Exact(_) => {}
                        LayoutName::Top => return MemoryLayoutType::Top,
                    }
                }
                if members.size().is_some() {
                    self.on_group_name_not_found(at, name)
                } else {
                    MemoryLayoutType::Top
                }
            }
        }
    }

    fn dereference_step(
        &mut self,
        at: usize,
        element: &PathElementType,
        layout: &MemoryLayoutType,
    ) -> MemoryLayoutType {
        match layout {
            MemoryLayoutType::Address(address) => match &address.target {
                Some(target) => (**target).clone(),
                None => self.on_invalid_dereference(at),
            },
            _ => self.on_mismatch(at, element, layout),
        }
    }
}
