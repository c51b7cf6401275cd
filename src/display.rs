//! Human readable rendering of a [`Tree`].
//!
//! The root is written on the first line and every other node on its own line
//! below its parent, connected with box-drawing characters:
//!
//! ```text
//! Hello
//! ├── ,
//! ├── World
//! └── !
//! ```
//!
//! An empty tree renders as the empty string.
use std::fmt::{self, Display, Write};

use crate::tree::Tree;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

impl<T: Display> Display for Tree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(root) = self.root() else {
            return Ok(());
        };

        // Whether the ancestor at each depth below the root is a last child.
        let mut last = Vec::new();
        let mut stack = vec![(root, 0)];

        while let Some((node, depth)) = stack.pop() {
            if depth > 0 {
                last.truncate(depth - 1);

                for &is_last in &last {
                    f.write_str(if is_last { SPACE } else { PIPE })?;
                }

                let is_last = self.next_sibling(node).is_none();
                f.write_str(if is_last { LAST_BRANCH } else { BRANCH })?;
                last.push(is_last);
            }

            write!(f, "{}", self[node])?;
            f.write_char('\n')?;

            stack.extend(self.children(node).rev().map(|child| (child, depth + 1)));
        }

        Ok(())
    }
}
