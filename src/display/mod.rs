/// 64x32 framebuffer, one byte per pixel (0 = off, 1 = on)
pub struct Display([u8; Self::WIDTH * Self::HEIGHT]);

impl Display {
    pub const WIDTH: usize = 64;
    pub const HEIGHT: usize = 32;

    pub fn clear(&mut self) {
        self.0.fill(0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl Default for Display {
    fn default() -> Self {
        Self([0; Self::WIDTH * Self::HEIGHT])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_zeroes_every_pixel() {
        let mut display = Display::default();
        display.as_mut_slice().fill(1);
        display.clear();

        assert_eq!(display.as_slice().len(), Display::WIDTH * Display::HEIGHT);
        assert!(display.as_slice().iter().all(|&p| p == 0));
    }
}
