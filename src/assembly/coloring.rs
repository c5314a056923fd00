use crate::error::Error;
use crate::mesh::SpectralMesh;
use crate::Real;
use std::collections::HashMap;
use std::mem;

/// A partition of elements into colors, such that no two elements of the same color share a
/// global node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementColoring {
    colors: Vec<Vec<usize>>,
}

impl ElementColoring {
    /// Color the given elements with a sequential greedy algorithm.
    ///
    /// Each item is an element index together with the global nodes of the element. Elements
    /// are assigned to the first color in which none of their nodes has been visited yet.
    pub fn greedy<'a>(elements: impl IntoIterator<Item = (usize, &'a [usize])>) -> Self {
        let elements: Vec<_> = elements.into_iter().collect();
        let mut colors = Vec::new();
        let mut postponed = Vec::new();
        let mut current: Vec<_> = (0..elements.len()).collect();

        // The index of the last color to visit any given node. The table grows as we run into
        // node indices that are out of bounds.
        let mut last_visited_color = vec![usize::MAX; 0];

        let mut color_idx = 0;
        while !current.is_empty() {
            let mut color = Vec::new();
            for &idx in &current {
                let (element, nodes) = elements[idx];
                let is_blocked = nodes
                    .iter()
                    .any(|&node| last_visited_color.get(node) == Some(&color_idx));
                if is_blocked {
                    postponed.push(idx);
                } else {
                    for &node in nodes {
                        if node >= last_visited_color.len() {
                            // Amortize resizes by growing more than we need right now
                            last_visited_color.resize(2 * node + 1, usize::MAX);
                        }
                        last_visited_color[node] = color_idx;
                    }
                    color.push(element);
                }
            }

            colors.push(color);
            mem::swap(&mut postponed, &mut current);
            postponed.clear();
            color_idx += 1;
        }

        if cfg!(debug_assertions) {
            let lookup: HashMap<usize, &[usize]> = elements.iter().copied().collect();
            debug_assert!(Self::check_disjoint(&colors, |element| lookup[&element]).is_ok());
        }

        Self { colors }
    }

    /// Color the given elements of a mesh.
    pub fn for_mesh<T: Real, const NGLL: usize>(
        mesh: &SpectralMesh<T, NGLL>,
        elements: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self::greedy(
            elements
                .into_iter()
                .map(|element| (element, mesh.element_nodes(element))),
        )
    }

    /// Use a coloring computed elsewhere, checking that it is valid.
    ///
    /// Returns [`Error::ColoringNotDisjoint`] if two elements of the same color share a node,
    /// and [`Error::InvalidTopology`] if an element appears more than once.
    pub fn try_from_colors<'a>(
        colors: Vec<Vec<usize>>,
        element_nodes: impl Fn(usize) -> &'a [usize],
    ) -> Result<Self, Error> {
        Self::check_disjoint(&colors, element_nodes)?;
        Ok(Self { colors })
    }

    fn check_disjoint<'a>(
        colors: &[Vec<usize>],
        element_nodes: impl Fn(usize) -> &'a [usize],
    ) -> Result<(), Error> {
        let mut last_visited_color = Vec::new();
        let mut seen_elements = Vec::new();
        for (color_idx, color) in colors.iter().enumerate() {
            for &element in color {
                if element >= seen_elements.len() {
                    seen_elements.resize(2 * element + 1, false);
                }
                if mem::replace(&mut seen_elements[element], true) {
                    return Err(Error::InvalidTopology(format!(
                        "element {element} appears more than once in the coloring"
                    )));
                }
                for &node in element_nodes(element) {
                    if node >= last_visited_color.len() {
                        last_visited_color.resize(2 * node + 1, usize::MAX);
                    }
                    if last_visited_color[node] == color_idx {
                        return Err(Error::ColoringNotDisjoint { color: color_idx, node });
                    }
                    last_visited_color[node] = color_idx;
                }
            }
        }
        Ok(())
    }

    pub fn colors(&self) -> &[Vec<usize>] {
        &self.colors
    }

    pub fn num_colors(&self) -> usize {
        self.colors.len()
    }

    pub fn num_elements(&self) -> usize {
        self.colors.iter().map(Vec::len).sum()
    }
}
