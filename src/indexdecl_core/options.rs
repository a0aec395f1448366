// Copyright 2024 Vincent Chan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Compute the outcome of every declaration without creating anything.
    pub dry_run: Option<bool>,
}

impl ApplyOptions {
    pub fn builder() -> ApplyOptionsBuilder {
        ApplyOptionsBuilder::default()
    }

    pub(crate) fn is_dry_run(&self) -> bool {
        self.dry_run.unwrap_or(false)
    }
}

pub struct ApplyOptionsBuilder {
    dry_run: Option<bool>,
}

impl ApplyOptionsBuilder {
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = Some(dry_run);
        self
    }

    pub fn build(self) -> ApplyOptions {
        ApplyOptions {
            dry_run: self.dry_run,
        }
    }
}

impl Default for ApplyOptionsBuilder {
    fn default() -> Self {
        ApplyOptionsBuilder { dry_run: None }
    }
}

impl Default for ApplyOptions {
    fn default() -> Self {
        ApplyOptions { dry_run: None }
    }
}
