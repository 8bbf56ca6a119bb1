// Per-depth row caps. One construction combines a user-supplied list with
// the service defaults (client can shrink, never grow); the other takes a
// single list as-is. Depths beyond the list repeat the last computed value;
// an empty list means unlimited at every depth.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Sizes {
	sizes: Vec<usize>,
}
impl Sizes {
	pub fn unlimited() -> Self {
		Self { sizes: Vec::new() }
	}

	pub fn from_list(list: &[usize]) -> Self {
		Self { sizes: list.to_vec() }
	}

	pub fn min_of(user: Option<&[usize]>, defaults: &[usize]) -> Self {
		let user = user.unwrap_or(&[]);
		let len = user.len().max(defaults.len());
		let mut sizes = Vec::with_capacity(len);

		for depth in 0..len {
			let user_cap = user.get(depth).copied().unwrap_or(usize::MAX);
			let default_cap = defaults.get(depth).copied().unwrap_or(usize::MAX);

			sizes.push(user_cap.min(default_cap));
		}

		Self { sizes }
	}

	pub fn size(&self, depth: usize) -> usize {
		match self.sizes.len() {
			0 => usize::MAX,
			len => self.sizes[depth.min(len - 1)],
		}
	}
}
