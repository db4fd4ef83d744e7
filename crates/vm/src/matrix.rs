use crate::appearance::Transform;

/// A 2-D affine transform.
///
/// A point maps to `(a*x + b*y + c, d*x + e*y + f)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

pub const COMPONENTS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Matrix { a, b, c, d, e, f }
    }

    pub fn from_components(c: [f32; 6]) -> Self {
        Matrix::new(c[0], c[1], c[2], c[3], c[4], c[5])
    }

    /// Components in `a..f` order.
    pub fn components(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    pub fn component(&self, name: &str) -> Option<f32> {
        COMPONENTS
            .iter()
            .position(|c| *c == name)
            .map(|i| self.components()[i])
    }

    pub fn set_component(&mut self, name: &str, value: f32) -> bool {
        let slot = match name {
            "a" => &mut self.a,
            "b" => &mut self.b,
            "c" => &mut self.c,
            "d" => &mut self.d,
            "e" => &mut self.e,
            "f" => &mut self.f,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub fn add(&self, rhs: &Matrix) -> Matrix {
        self.zip(rhs, |l, r| l + r)
    }

    pub fn subtract(&self, rhs: &Matrix) -> Matrix {
        self.zip(rhs, |l, r| l - r)
    }

    pub fn scalar(&self, k: f32) -> Matrix {
        Matrix::from_components(self.components().map(|c| c * k))
    }

    /// The composition `self ∘ rhs`: `rhs` applies first.
    pub fn multiply(&self, rhs: &Matrix) -> Matrix {
        let (l, r) = (self, rhs);
        Matrix::new(
            r.a * l.a + r.d * l.b,
            r.b * l.a + r.e * l.b,
            r.c * l.a + r.f * l.b + l.c,
            r.a * l.d + r.d * l.e,
            r.b * l.d + r.e * l.e,
            r.c * l.d + r.f * l.e + l.f,
        )
    }

    pub fn determinant(&self) -> f32 {
        self.a * self.e - self.d * self.b
    }

    /// `None` for a singular matrix.
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det == 0.0 {
            return None;
        }
        Some(Matrix::new(
            self.e / det,
            -self.b / det,
            (self.b * self.f - self.e * self.c) / det,
            -self.d / det,
            self.a / det,
            (self.d * self.c - self.a * self.f) / det,
        ))
    }

    pub fn translate(&self, x: f32, y: f32) -> Matrix {
        Matrix {
            c: self.c + x,
            f: self.f + y,
            ..*self
        }
    }

    pub fn scale(&self, x: f32, y: f32) -> Matrix {
        Matrix::new(
            self.a * x,
            self.b * x,
            self.c * x,
            self.d * y,
            self.e * y,
            self.f * y,
        )
    }

    /// Rotate clockwise by `degrees`.
    pub fn turn(&self, degrees: f32) -> Matrix {
        let (sin, cos) = degrees.to_radians().sin_cos();
        self.multiply(&Matrix::new(cos, sin, 0.0, -sin, cos, 0.0))
    }

    pub fn to_transform(&self) -> Transform {
        Transform([self.a, self.d, self.b, self.e, self.c, self.f])
    }

    pub fn from_transform(t: &Transform) -> Matrix {
        let [a, d, b, e, c, f] = t.0;
        Matrix::new(a, b, c, d, e, f)
    }

    fn zip(&self, rhs: &Matrix, op: impl Fn(f32, f32) -> f32) -> Matrix {
        let (l, r) = (self.components(), rhs.components());
        Matrix::from_components([0, 1, 2, 3, 4, 5].map(|i| op(l[i], r[i])))
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}
